//! Build script for ti32-provision
//!
//! - Reads device.toml (or the file named by TI32_DEVICE_CONFIG)
//! - Applies per-field environment overrides
//! - Validates the result and embeds it as the compiled-in configuration

use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use ti32_core::config::{ConfigField, ConfigStore, RawConfigValues};

// embassy-sync in ti32-core needs a critical-section implementation to link
use critical_section as _;

const DEFAULT_CONFIG: &str = "device.toml";
const CONFIG_PATH_VAR: &str = "TI32_DEVICE_CONFIG";

type Values = [Option<String>; ConfigField::ALL.len()];

fn main() {
    println!("cargo:rerun-if-changed=build.rs");
    println!("cargo:rerun-if-env-changed={}", CONFIG_PATH_VAR);
    for field in ConfigField::ALL {
        println!("cargo:rerun-if-env-changed={}", field.source_name());
    }

    let explicit = env::var_os(CONFIG_PATH_VAR).map(PathBuf::from);
    let path = explicit
        .clone()
        .unwrap_or_else(|| PathBuf::from(DEFAULT_CONFIG));
    println!("cargo:rerun-if-changed={}", path.display());

    let mut values: Values = Default::default();
    let from_file = read_config_file(&path, explicit.is_some(), &mut values);
    let from_env = apply_env_overrides(&mut values);

    let code = if from_file || from_env {
        let raw = to_raw(&values);
        validate(&raw, &path);
        println!("cargo:warning=device configuration validated successfully");
        embedded_source(&raw)
    } else {
        println!(
            "cargo:warning=no {} found and no configuration variables set; \
             the firmware will rely on provisioned flash",
            path.display()
        );
        String::from(
            "pub const EMBEDDED_CONFIG: Option<RawConfigValues<'static>> = None;\n",
        )
    };

    let out_dir = match env::var("OUT_DIR") {
        Ok(dir) => PathBuf::from(dir),
        Err(e) => fail("OUT_DIR is not set", &[e.to_string()]),
    };
    if let Err(e) = fs::write(out_dir.join("embedded_config.rs"), code) {
        fail("Failed to write embedded_config.rs", &[e.to_string()]);
    }
}

/// Load the TOML file into `values`; false when there is no file to read
fn read_config_file(path: &Path, explicit: bool, values: &mut Values) -> bool {
    if !path.exists() {
        if explicit {
            fail(
                "Configuration file not found",
                &[format!("{} = {}", CONFIG_PATH_VAR, path.display())],
            );
        }
        return false;
    }

    let content = match fs::read_to_string(path) {
        Ok(content) => content,
        Err(e) => fail(&format!("Failed to read {}", path.display()), &[e.to_string()]),
    };

    let table: toml::Table = match toml::from_str(&content) {
        Ok(table) => table,
        Err(e) => fail(
            &format!("Invalid TOML syntax in {}", path.display()),
            &e.to_string().lines().map(String::from).collect::<Vec<_>>(),
        ),
    };

    let mut errors = Vec::new();
    for (key, value) in &table {
        match value {
            toml::Value::Table(section) => {
                for (name, value) in section {
                    let location = format!("[{}] {}", key, name);
                    match ConfigField::from_toml_key(key, name) {
                        Some(field) => store(values, field, value, &location, &mut errors),
                        None => errors.push(format!("{}: unknown key", location)),
                    }
                }
            }
            _ => match ConfigField::from_source_name(key) {
                Some(field) => store(values, field, value, key, &mut errors),
                None => errors.push(format!("{}: unknown key", key)),
            },
        }
    }

    if !errors.is_empty() {
        fail(&format!("Invalid {}", path.display()), &errors);
    }
    true
}

fn store(
    values: &mut Values,
    field: ConfigField,
    value: &toml::Value,
    location: &str,
    errors: &mut Vec<String>,
) {
    let slot = &mut values[field as usize];
    match value {
        toml::Value::String(_) if slot.is_some() => {
            errors.push(format!("{}: {} is set twice", location, field));
        }
        toml::Value::String(text) => *slot = Some(text.clone()),
        _ => errors.push(format!("{}: expected a string", location)),
    }
}

/// Environment variables named after each field replace file values
fn apply_env_overrides(values: &mut Values) -> bool {
    let mut any = false;
    for field in ConfigField::ALL {
        if let Ok(value) = env::var(field.source_name()) {
            values[field as usize] = Some(value);
            any = true;
        }
    }
    any
}

fn to_raw(values: &Values) -> RawConfigValues<'_> {
    let mut raw: RawConfigValues<'_> = RawConfigValues::EMPTY;
    for field in ConfigField::ALL {
        raw.set(field, values[field as usize].as_deref().unwrap_or(""));
    }
    raw
}

fn validate(raw: &RawConfigValues<'_>, path: &Path) {
    if let Err(e) = ConfigStore::load(*raw) {
        fail(
            "Device configuration rejected",
            &[
                e.to_string(),
                format!("Edit {} or the matching variable", path.display()),
            ],
        );
    }
}

fn embedded_source(raw: &RawConfigValues<'_>) -> String {
    format!(
        r#"pub const EMBEDDED_CONFIG: Option<RawConfigValues<'static>> = Some(RawConfigValues {{
    wifi_ssid: {ssid:?},
    wifi_passphrase: {pass:?},
    http_username: {user:?},
    http_password: {password:?},
    server_base_url: {url:?},
    chat_display_name: {name:?},
}});
"#,
        ssid = raw.wifi_ssid,
        pass = raw.wifi_passphrase,
        user = raw.http_username,
        password = raw.http_password,
        url = raw.server_base_url,
        name = raw.chat_display_name,
    )
}

/// Abort the build with a boxed diagnostic
fn fail(title: &str, lines: &[String]) -> ! {
    let body = lines
        .iter()
        .map(|line| format!("║  {:<64} ║", truncate(line)))
        .collect::<Vec<_>>()
        .join("\n");
    panic!(
        "\n\
        ╔══════════════════════════════════════════════════════════════════╗\n\
        ║  ERROR: {:<58} ║\n\
        ╠══════════════════════════════════════════════════════════════════╣\n\
        {}\n\
        ╚══════════════════════════════════════════════════════════════════╝\n",
        truncate(title),
        body
    );
}

fn truncate(line: &str) -> String {
    if line.chars().count() > 64 {
        let cut: String = line.chars().take(61).collect();
        format!("{}...", cut)
    } else {
        line.to_string()
    }
}
