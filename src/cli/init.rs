use std::path::PathBuf;

use crate::db::{get_connection, init_db, DB_FILE};
use crate::error::Result;
use crate::settings::{load_settings, save_settings, shellexpand_path, Settings};

pub fn run(data_dir: Option<String>, church: Option<String>) -> Result<()> {
    let mut settings = load_settings();
    let defaults = Settings::default();

    if let Some(dir) = data_dir {
        settings.data_dir = shellexpand_path(&dir);
    } else if settings.data_dir == defaults.data_dir {
        // First run: prompt for data dir
        println!("Data directory [{}]: ", settings.data_dir);
        let mut input = String::new();
        std::io::stdin().read_line(&mut input)?;
        let chosen = input.trim();
        if !chosen.is_empty() {
            settings.data_dir = shellexpand_path(chosen);
        }
    }
    if let Some(name) = church {
        settings.church_name = name.trim().to_string();
    }

    save_settings(&settings)?;

    let resolved = PathBuf::from(&settings.data_dir);
    std::fs::create_dir_all(&resolved)?;
    std::fs::create_dir_all(resolved.join("backups"))?;

    let conn = get_connection(&resolved.join(DB_FILE))?;
    init_db(&conn)?;

    println!("Initialized church-ledger at {}", resolved.display());
    Ok(())
}
