use pfile::persistence::{CharacterStore, SaveMode, TransientSnapshot};
use pfile::PersistenceConfig;
use std::path::Path;

fn main() -> Result<(), String> {
    let args: Vec<String> = std::env::args().collect();
    if args.len() < 3 {
        return Err("usage: pfile_dump <data-root> <name>".to_string());
    }
    let root = Path::new(&args[1]);
    pfile::telemetry::logging::init(root)?;
    let config = PersistenceConfig::load(root).map_err(|err| err.to_string())?;
    let store = CharacterStore::from_root(root, config);
    let index = store.open_index().map_err(|err| err.to_string())?;
    let record = store.load(&index, &args[2]).map_err(|err| err.to_string())?;

    eprintln!(
        "pfile_dump: {} (id {}, level {}, {} stored affects)",
        record.name,
        record.id,
        record.level,
        record.stored_affects.len()
    );
    print!(
        "{}",
        store.write_record(&record, &TransientSnapshot::default(), SaveMode::Full)
    );
    index.teardown();
    Ok(())
}
