use anyhow::{bail, Context, Result};
use tracing::info;
use translation_editor::config::Config;
use translation_editor::TranslationEditor;

const DEFAULT_BACKUP_DAYS: u64 = 30;

fn print_usage() {
    println!(
        r#"Translation editor

USAGE:
    translation-editor <COMMAND> [ARGS]

COMMANDS:
    languages                          List languages with file counts
    files [lang]                       List translation files (default: APP_LOCALE)
    show <lang> <file>                 Print every key of a file
    add <lang> <file> <key> <value>    Add a key and sync it to other languages
    remove <lang> <file> <key>         Remove a key from every language
    vendor                             List vendor packages and their languages
    providers                          Show translation provider status
    prune-backups [days]               Delete backups older than [days] (default: {days})

Nested keys use '<~>' as separator, e.g. 'auth<~>failed'.
Use '__json' as <file> to edit the language's JSON file."#,
        days = DEFAULT_BACKUP_DAYS
    );
}

fn arg<'a>(args: &'a [String], index: usize, name: &str) -> Result<&'a str> {
    args.get(index)
        .map(String::as_str)
        .with_context(|| format!("Missing argument <{}>", name))
}

fn language_or_default<'a>(args: &'a [String], index: usize, config: &'a Config) -> &'a str {
    args.get(index)
        .map(String::as_str)
        .unwrap_or(config.default_language.as_str())
}

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env file if present
    let _ = dotenvy::dotenv();

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("translation_editor=info".parse()?),
        )
        .init();

    let args: Vec<String> = std::env::args().collect();
    if args.len() < 2 {
        print_usage();
        return Ok(());
    }

    let config = Config::from_env()?;
    info!("Using language path {}", config.language_path.display());
    let editor = TranslationEditor::from_config(config).await;

    match args[1].as_str() {
        "languages" => {
            editor.check_language_path()?;
            for summary in editor.language_summaries() {
                println!(
                    "{:<8} {:<24} {} php file(s){}",
                    summary.code,
                    summary.name,
                    summary.php_files_count,
                    if summary.has_json { ", json" } else { "" }
                );
            }
        }
        "files" => {
            let language = language_or_default(&args, 2, editor.config());
            for file in editor.list_files(language) {
                println!("{}", file);
            }
        }
        "show" => {
            let language = arg(&args, 2, "lang")?;
            let filename = arg(&args, 3, "file")?;
            for (key, value) in editor.read_file(language, filename) {
                println!("{} = {}", key, value);
            }
        }
        "add" => {
            let language = arg(&args, 2, "lang")?;
            let filename = arg(&args, 3, "file")?;
            let key = arg(&args, 4, "key")?;
            let value = arg(&args, 5, "value")?;
            let change = editor.add_key(language, filename, key, value).await?;
            if !change.saved {
                bail!("Failed to save {}/{}", language, filename);
            }
            println!("Added '{}'; synced to: {}", key, change.synced.join(", "));
        }
        "remove" => {
            let language = arg(&args, 2, "lang")?;
            let filename = arg(&args, 3, "file")?;
            let key = arg(&args, 4, "key")?;
            let change = editor.remove_key(language, filename, key).await?;
            if !change.saved {
                bail!("Failed to save {}/{}", language, filename);
            }
            println!("Removed '{}'; synced to: {}", key, change.synced.join(", "));
        }
        "vendor" => {
            let packages = editor.vendor_packages();
            if packages.is_empty() {
                println!("No vendor packages (set TRANSLATION_EDITOR_VENDOR=true to enable)");
            }
            for package in packages {
                println!("{}", package.name);
                for language in package.languages {
                    println!(
                        "    {:<8} {:<24} {} file(s)",
                        language.code, language.name, language.php_files_count
                    );
                }
            }
        }
        "providers" => {
            let Some(translator) = editor.translator() else {
                println!("No translation providers configured");
                return Ok(());
            };
            println!(
                "Auto-translation: {}",
                if translator.is_auto_translation_enabled().await { "enabled" } else { "disabled" }
            );
            for status in translator.providers_status().await {
                println!(
                    "{:<16} {:<12} {:>4} language(s){}",
                    status.name,
                    if status.available { "available" } else { "unavailable" },
                    status.supported_languages_count,
                    if status.is_default { " (default)" } else { "" }
                );
            }
        }
        "prune-backups" => {
            let days = match args.get(2) {
                Some(raw) => raw
                    .parse::<u64>()
                    .with_context(|| format!("Invalid number of days: {}", raw))?,
                None => DEFAULT_BACKUP_DAYS,
            };
            let removed = editor.store().prune_backups(days);
            println!("Removed {} backup(s) older than {} day(s)", removed, days);
        }
        "--help" | "-h" | "help" => print_usage(),
        other => {
            eprintln!("Unknown command: {}", other);
            print_usage();
            std::process::exit(1);
        }
    }

    Ok(())
}
