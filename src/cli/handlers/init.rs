use crate::cli::commands::InitArgs;
use crate::cli::output::CreatedJson;
use crate::io::config_io;
use crate::io::file_store::FileStore;
use crate::model::TrellisConfig;
use crate::panel::Panel;

use super::workspace_start;

/// `trl init`: create `.trellis/` in the start directory and the first list.
pub fn cmd_init(
    args: InitArgs,
    workspace_dir: Option<&str>,
    json: bool,
) -> Result<(), Box<dyn std::error::Error>> {
    let root = workspace_start(workspace_dir)?;

    let mut config = TrellisConfig::default();
    if let Some(name) = args.name.as_deref().map(str::trim).filter(|n| !n.is_empty()) {
        config.list.name = name.to_string();
    }
    let dir = config_io::init_workspace(&root, &config)?;

    let store = FileStore::open(&dir)?;
    let mut panel = Panel::new(store, &config);
    let id = panel.open(&args.instance, &config.list.name)?;

    if json {
        let out = CreatedJson { kind: "list", id: &id };
        println!("{}", serde_json::to_string_pretty(&out)?);
    } else {
        println!("Initialized {} with list \"{}\"", dir.display(), config.list.name);
        println!("{id}");
    }
    Ok(())
}
