mod cli;
mod paths;
mod run;

use anyhow::{Context, Result};
use cli::{Command, GlowArgs, PresetAction};
use run::AppContext;

fn main() -> Result<()> {
    let cli = cli::parse();
    run::initialise_tracing();
    let ctx = AppContext::load()?;

    match cli.command {
        Command::Render(args) => run::render(args, &ctx),
        Command::Strip(args) => run::strip(args, &ctx),
        Command::Preview(args) => run::preview(args, &ctx),
        Command::Preset(preset_cmd) => handle_preset_command(preset_cmd.action, &ctx),
        Command::Where => run_where(&ctx),
    }
}

fn handle_preset_command(action: PresetAction, ctx: &AppContext) -> Result<()> {
    match action {
        PresetAction::Save { glow, name } => run_preset_save(&glow, name.as_deref(), ctx),
        PresetAction::List => run_preset_list(ctx),
        PresetAction::Show { key } => run_preset_show(&key, ctx),
        PresetAction::Delete { key } => run_preset_delete(&key, ctx),
    }
}

fn run_preset_save(glow: &GlowArgs, name: Option<&str>, ctx: &AppContext) -> Result<()> {
    let params = run::resolve_glow(glow, ctx)?;
    let path = ctx.paths.library_file();
    let mut library = ctx.library()?;
    let saved = library.add(name, params)?;
    println!("Saved preset {} ({})", saved.name, saved.id);
    library
        .persist(&path)
        .with_context(|| format!("failed to save preset library to {}", path.display()))
}

fn run_preset_list(ctx: &AppContext) -> Result<()> {
    let library = ctx.library()?;
    if library.is_empty() {
        println!(
            "No presets saved yet ({})",
            ctx.paths.library_file().display()
        );
        return Ok(());
    }

    println!("Saved presets:");
    for preset in library.list() {
        let settings = &preset.settings;
        println!(
            "  {:<14} {:<20} shape={:<8} color={} pixels={}",
            preset.id,
            preset.name,
            settings.shape_mode,
            settings.color.to_hex(),
            settings.pixel_count
        );
    }
    Ok(())
}

fn run_preset_show(key: &str, ctx: &AppContext) -> Result<()> {
    let library = ctx.library()?;
    let preset = library.find(key)?;
    let json = serde_json::to_string_pretty(preset).context("failed to serialize preset")?;
    println!("{json}");
    Ok(())
}

fn run_preset_delete(key: &str, ctx: &AppContext) -> Result<()> {
    let path = ctx.paths.library_file();
    let mut library = ctx.library()?;
    let id = library.find(key)?.id;
    let removed = library.remove(id)?;
    library
        .persist(&path)
        .with_context(|| format!("failed to save preset library to {}", path.display()))?;
    println!("Deleted preset {} ({})", removed.name, removed.id);
    Ok(())
}

fn run_where(ctx: &AppContext) -> Result<()> {
    let paths = &ctx.paths;
    println!("Configuration directories:");
    println!("  config:     {}", paths.config_dir().display());
    println!("  data:       {}", paths.data_dir().display());
    println!("  output:     {}", paths.output_dir().display());
    println!("  config.toml {}", paths.config_file().display());
    println!("  library     {}", paths.library_file().display());
    if let Some(dir) = &ctx.config.output.directory {
        println!("Configured output override: {}", dir.display());
    }
    Ok(())
}
