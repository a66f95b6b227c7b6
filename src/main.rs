use std::path::PathBuf;
use std::process::ExitCode;

use fieldbook::config::FieldbookConfig;
use fieldbook::core::dates::storage_to_display;
use fieldbook::sync::Fieldbook;
use fieldbook::sync::http::HttpBackend;

const USAGE: &str = "usage: fieldbook [--user ID] [--config PATH] [--fields | --tasks | --crops | --field ID]";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Command {
    Dashboard,
    Fields,
    Tasks,
    Crops,
    Field(i64),
}

#[derive(Debug)]
struct Args {
    user_id: Option<i64>,
    config_path: Option<PathBuf>,
    command: Command,
}

fn parse_args(args: impl IntoIterator<Item = String>) -> Result<Args, String> {
    let mut parsed = Args {
        user_id: None,
        config_path: None,
        command: Command::Dashboard,
    };
    let mut args = args.into_iter();
    while let Some(arg) = args.next() {
        match arg.as_str() {
            "--user" => parsed.user_id = Some(parse_id(args.next(), "--user")?),
            "--config" => {
                let path = args.next().ok_or("--config needs a path")?;
                parsed.config_path = Some(PathBuf::from(path));
            }
            "--fields" => parsed.command = Command::Fields,
            "--tasks" => parsed.command = Command::Tasks,
            "--crops" => parsed.command = Command::Crops,
            "--field" => parsed.command = Command::Field(parse_id(args.next(), "--field")?),
            other => return Err(format!("unknown argument '{}'", other)),
        }
    }
    Ok(parsed)
}

fn parse_id(value: Option<String>, flag: &str) -> Result<i64, String> {
    let value = value.ok_or_else(|| format!("{} needs an id", flag))?;
    value
        .parse()
        .map_err(|_| format!("{} expects a number, got '{}'", flag, value))
}

// Journal logger: fieldbook targets at info/debug (per config), everything else at warn.
// View with `journalctl --user -t fieldbook -f`.
fn init_logging(debug: bool) {
    struct FilteredJournal {
        inner: systemd_journal_logger::JournalLog,
    }

    impl log::Log for FilteredJournal {
        fn enabled(&self, metadata: &log::Metadata) -> bool {
            if metadata.target().starts_with("fieldbook") {
                let max = if fieldbook::debug_logging() { log::LevelFilter::Debug } else { log::LevelFilter::Info };
                metadata.level() <= max
            } else {
                metadata.level() <= log::LevelFilter::Warn
            }
        }
        fn log(&self, record: &log::Record) {
            if self.enabled(record.metadata()) {
                self.inner.log(record);
            }
        }
        fn flush(&self) {
            self.inner.flush();
        }
    }

    fieldbook::set_debug_logging(debug);

    let journal = match systemd_journal_logger::JournalLog::new() {
        Ok(journal) => journal.with_syslog_identifier("fieldbook".to_string()),
        Err(e) => {
            eprintln!("Journal unavailable, logging disabled: {}", e);
            return;
        }
    };
    if let Err(e) = log::set_boxed_logger(Box::new(FilteredJournal { inner: journal })) {
        eprintln!("Failed to install logger: {}", e);
        return;
    }
    // Global max must be Debug so fieldbook debug logs can pass through when toggled
    log::set_max_level(log::LevelFilter::Debug);
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> ExitCode {
    let args = match parse_args(std::env::args().skip(1)) {
        Ok(args) => args,
        Err(e) => {
            eprintln!("{}\n{}", e, USAGE);
            return ExitCode::from(2);
        }
    };

    let config_path = args.config_path.clone().unwrap_or_else(FieldbookConfig::default_path);
    let (config, config_error) = match FieldbookConfig::try_load(&config_path) {
        Ok(config) => (config, None),
        Err(e) => (FieldbookConfig::default(), Some(e)),
    };
    init_logging(config.debug_logging);
    // Reported only now so the warning reaches the journal.
    if let Some(e) = config_error {
        log::warn!("Ignoring {}", e);
        eprintln!("Warning: ignoring {}", e);
    }

    let backend = match HttpBackend::new(&config) {
        Ok(backend) => backend,
        Err(e) => {
            eprintln!("Could not set up HTTP client: {}", e);
            return ExitCode::FAILURE;
        }
    };
    let book = Fieldbook::new(backend);

    let result = match args.command {
        Command::Field(field_id) => show_field(&book, field_id).await,
        command => {
            let Some(user_id) = args.user_id.or(config.user_id) else {
                eprintln!("No user id: pass --user or set user_id in {}", config_path.display());
                return ExitCode::from(2);
            };
            match command {
                Command::Fields => show_fields(&book, user_id).await,
                Command::Tasks => show_tasks(&book, user_id).await,
                Command::Crops => show_crops(&book, user_id).await,
                _ => show_dashboard(&book, user_id).await,
            }
        }
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("Error: {}", e);
            ExitCode::FAILURE
        }
    }
}

type ShowResult = fieldbook::sync::error::Result<()>;

async fn show_dashboard(book: &Fieldbook<HttpBackend>, user_id: i64) -> ShowResult {
    book.reload_dashboard(user_id).await?;
    let dashboard = book.views().dashboard.get();

    println!("=== {} {} ===\n", dashboard.reference_day_name, dashboard.reference_day_number);
    println!("Upcoming harvests:");
    if dashboard.harvests.is_empty() {
        println!("  (none)");
    }
    for harvest in &dashboard.harvests {
        println!("  {}  {} ({})", harvest.when_display, harvest.field_name, harvest.crop_title);
    }
    println!("\nUpcoming tasks:");
    if dashboard.tasks.is_empty() {
        println!("  (none)");
    }
    for task in &dashboard.tasks {
        let marker = if task.is_today { " [today]" } else { "" };
        println!(
            "  {}  {} - {}{}",
            storage_to_display(&task.due_date),
            task.field_name,
            task.description,
            marker
        );
    }
    Ok(())
}

async fn show_fields(book: &Fieldbook<HttpBackend>, user_id: i64) -> ShowResult {
    book.reload_fields(user_id).await?;
    let fields = book.views().fields.get();
    println!("=== {} fields ===\n", fields.len());
    for field in &fields {
        let crop = if field.crop_name.is_empty() { "-" } else { field.crop_name.as_str() };
        println!(
            "  #{} {}  crop: {}  status: {}  harvest in {} days",
            field.id,
            field.title,
            crop,
            field.status.as_label(),
            field.days_until_harvest
        );
    }
    Ok(())
}

async fn show_tasks(book: &Fieldbook<HttpBackend>, user_id: i64) -> ShowResult {
    book.reload_tasks(user_id).await?;
    let tasks = book.views().tasks.get();
    println!("=== {} tasks ===\n", tasks.len());
    for task in &tasks {
        println!(
            "  #{} {}  {} ({})",
            task.id,
            storage_to_display(&task.due_date),
            task.description,
            task.field_name
        );
    }
    Ok(())
}

async fn show_crops(book: &Fieldbook<HttpBackend>, user_id: i64) -> ShowResult {
    book.reload_crops(user_id).await?;
    let crops = book.views().crops.get();
    println!("=== {} crops ===\n", crops.len());
    for entry in &crops {
        println!(
            "  #{} {} on {}  status: {}  harvest: {}",
            entry.crop.id,
            entry.crop.title,
            entry.field_name,
            entry.crop.status.as_label(),
            storage_to_display(&entry.crop.harvest_date)
        );
    }
    Ok(())
}

async fn show_field(book: &Fieldbook<HttpBackend>, field_id: i64) -> ShowResult {
    book.load_field_detail(field_id).await?;
    let Some(detail) = book.views().field_detail.get() else {
        return Ok(());
    };

    println!("=== {} (#{}) ===\n", detail.field.name, detail.field.id);
    if !detail.field.location.is_empty() {
        println!("  Location: {}", detail.field.location);
    }
    if !detail.field.size.is_empty() {
        println!("  Size: {}", detail.field.size);
    }
    match &detail.crop {
        Some(crop) => {
            println!("  Crop: {} [{}]", crop.title, crop.status.as_label());
            if let Some(days) = detail.days_until_harvest {
                println!("  Harvest: {} (in {} days)", storage_to_display(&crop.harvest_date), days);
            }
        }
        None => println!("  Crop: -"),
    }
    if let Some(progress) = &detail.progress {
        println!(
            "  Watered: {}  Fertilized: {}  Pests: {}",
            storage_to_display(&progress.watered),
            storage_to_display(&progress.fertilized),
            progress.pests
        );
    }
    println!("\n  Tasks:");
    for task in &detail.tasks {
        println!("    {}  {}", storage_to_display(&task.due_date), task.description);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args(list: &[&str]) -> Result<Args, String> {
        parse_args(list.iter().map(|s| s.to_string()))
    }

    #[test]
    fn defaults_to_dashboard() {
        let parsed = args(&["--user", "7"]).unwrap();
        assert_eq!(parsed.user_id, Some(7));
        assert_eq!(parsed.command, Command::Dashboard);
    }

    #[test]
    fn field_takes_an_id() {
        assert_eq!(args(&["--field", "3"]).unwrap().command, Command::Field(3));
        assert!(args(&["--field"]).is_err());
        assert!(args(&["--field", "north"]).is_err());
    }

    #[test]
    fn rejects_unknown_flags() {
        assert!(args(&["--capture"]).is_err());
    }
}
