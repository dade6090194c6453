use anyhow::{anyhow, Result};
use cmdboot_config::Configuration;
use std::{
    env,
    fs::File,
    io::{BufReader, Read},
    path::PathBuf,
};

const DEFAULT_CONFIG_FILENAME: &str = "./cmdboot_config/sample_configurations/stm32f103c8.ron";

fn main() -> Result<()> {
    println!("cargo:rerun-if-env-changed=CMDBOOT_CONFIG");
    println!("cargo:rerun-if-changed={}", DEFAULT_CONFIG_FILENAME);
    println!("cargo:rerun-if-changed=build.rs");

    let filename = env::var("CMDBOOT_CONFIG").unwrap_or_else(|_| DEFAULT_CONFIG_FILENAME.into());
    println!("cargo:rerun-if-changed={}", filename);

    let file = File::open(&filename)?;
    let mut buf_reader = BufReader::new(file);
    let mut contents = String::new();
    buf_reader.read_to_string(&mut contents)?;
    let configuration: Configuration = ron::from_str(&contents)?;

    let problems: Vec<String> =
        configuration.configuration_problems().map(|p| p.to_string()).collect();
    if !problems.is_empty() {
        return Err(anyhow!("Invalid configuration {}:\n{}", filename, problems.join("\n")));
    }
    validate_feature_flags_against_configuration(&configuration);

    let out_dir = PathBuf::from(env::var("OUT_DIR")?);
    cmdboot_config::codegen::generate_modules(&out_dir, &configuration)?;
    println!("cargo:rustc-link-search={}", out_dir.display());
    if env::var("CARGO_CFG_TARGET_ARCH").map(|arch| arch == "arm").unwrap_or(false) {
        println!("cargo:rustc-link-arg-bins=-Tlink.x");
        if env::var("CARGO_FEATURE_DEFMT").is_ok() {
            println!("cargo:rustc-link-arg-bins=-Tdefmt.x");
        }
    }
    Ok(())
}

fn validate_feature_flags_against_configuration(configuration: &Configuration) {
    if env::var("CARGO_FEATURE_STM32F103").is_ok() {
        assert_eq!(configuration.port.feature_name(), "stm32f103",
            "Mismatching port in configuration file. Features require stm32f103, configuration requires {}",
            configuration.port.feature_name());
    }
}
