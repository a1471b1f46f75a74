//! Forwards access point credentials from `.env` into the firmware image
//! and pulls in the esp-hal linker script.

const FORWARDED: [&str; 2] = ["TALLY_AP_SSID", "TALLY_AP_PASSWORD"];

fn main() {
    println!("cargo:rerun-if-changed=.env");
    for key in FORWARDED {
        println!("cargo:rerun-if-env-changed={key}");
    }

    // A missing .env is fine: the firmware falls back to its defaults.
    if let Err(e) = dotenvy::dotenv()
        && !e.not_found()
    {
        println!("cargo:warning=failed to read .env: {e}");
    }

    for key in FORWARDED {
        if let Ok(value) = std::env::var(key) {
            println!("cargo:rustc-env={key}={value}");
        }
    }

    println!("cargo:rustc-link-arg=-Tlinkall.x");
}
