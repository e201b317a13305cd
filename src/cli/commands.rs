use anyhow::Result;
use colored::Colorize;

use crate::{
    app::init_config,
    models::{list_models, ModelCategory, ModelDescriptor},
};

/// List available models grouped by where they run
pub fn print_models() {
    print_group("Cloud models", ModelCategory::Cloud);
    println!();
    print_group("Local models (Ollama)", ModelCategory::Local);
}

fn print_group(title: &str, category: ModelCategory) {
    println!("{}:", title.bold());
    for model in list_models().iter().filter(|m| m.category == category) {
        println!("{}", describe_model(model));
    }
}

fn describe_model(model: &ModelDescriptor) -> String {
    match model.description {
        Some(description) => format!(
            "  • {} - {}\n      {}",
            model.id.green(),
            model.name,
            description.dimmed()
        ),
        None => format!("  • {} - {}", model.id.green(), model.name),
    }
}

/// Write the default configuration file
pub fn run_init() -> Result<()> {
    println!("Initializing Deep Search configuration...");
    let (path, created) = init_config()?;
    if created {
        println!("Created default configuration at: {}", path.display());
    } else {
        println!("Configuration already exists at: {}", path.display());
    }
    Ok(())
}

/// Show version information
pub fn show_version() {
    println!("Deep Search v{}", env!("CARGO_PKG_VERSION"));
    println!("   Streaming chat with cloud and local models");
}
