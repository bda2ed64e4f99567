use std::fs;
use std::process;

macro_rules! die {
    ($result:expr, $($arg:tt)*) => {
        $result.unwrap_or_else(|e| {
            eprintln!($($arg)*, e);
            process::exit(1);
        })
    };
}

pub fn settings_export() {
    print!("{}", imf_core::settings::default_toml());
}

pub fn settings_validate(file: &str) {
    let content = die!(fs::read_to_string(file), "Error reading {file}: {}");
    let s = die!(
        imf_core::settings::parse_settings_toml(&content),
        "Error: {}"
    );
    println!(
        "OK: service.system_ability_id={}, recovery.max_attempts={}, recovery.base_delay_ms={}, channel.capacity={}",
        s.service.system_ability_id,
        s.recovery.max_attempts,
        s.recovery.base_delay_ms,
        s.channel.capacity
    );
}
