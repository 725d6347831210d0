use std::path::PathBuf;
use std::sync::Arc;

use pincard::capture::{DraftStore, PageInfo, PageMetadata, StaticPage};
use pincard::config::PincardConfig;
use pincard::core::LocationPath;
use pincard::error::SubmitError;
use pincard::sync::{
    FileStorage, LocalCache, SubmissionPipeline, SubmitOutcome, SubmitTrigger, TrelloClient, keyring,
};

const USAGE: &str = "usage: pincard --link <url> [--title <title>] [--image <url>] \
[--description <text>] [--location <org/board/list>] [--remember-site <fragment>] [--submit]
       pincard --store-token <token>";

/// Command-line flags.
#[derive(Debug, Default)]
struct CaptureArgs {
    config: Option<PathBuf>,
    link: Option<String>,
    title: Option<String>,
    image: Option<String>,
    description: Option<String>,
    location: Option<String>,
    remember_site: Option<String>,
    store_token: Option<String>,
    submit: bool,
}

impl CaptureArgs {
    fn parse(args: &[String]) -> Result<Self, String> {
        let mut parsed = Self::default();
        let mut iter = args.iter().skip(1);
        while let Some(arg) = iter.next() {
            let mut value = || {
                iter.next()
                    .cloned()
                    .ok_or_else(|| format!("{} needs a value\n{}", arg, USAGE))
            };
            match arg.as_str() {
                "--config" => parsed.config = Some(PathBuf::from(value()?)),
                "--link" => parsed.link = Some(value()?),
                "--title" => parsed.title = Some(value()?),
                "--image" => parsed.image = Some(value()?),
                "--description" => parsed.description = Some(value()?),
                "--location" => parsed.location = Some(value()?),
                "--remember-site" => parsed.remember_site = Some(value()?),
                "--store-token" => parsed.store_token = Some(value()?),
                "--submit" => parsed.submit = true,
                other => return Err(format!("unknown argument '{}'\n{}", other, USAGE)),
            }
        }
        Ok(parsed)
    }
}

fn install_logger(config: &PincardConfig) {
    // Wrapper filters: pincard at info/debug (per config), everything else at warn.
    struct FilteredJournal {
        inner: systemd_journal_logger::JournalLog,
    }

    impl log::Log for FilteredJournal {
        fn enabled(&self, metadata: &log::Metadata) -> bool {
            if metadata.target().starts_with("pincard") {
                let max = if pincard::debug_logging() { log::LevelFilter::Debug } else { log::LevelFilter::Info };
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

    pincard::set_debug_logging(config.debug_logging);

    // Journal logging (`journalctl --user -t pincard -f`); without a journal we run silent.
    match systemd_journal_logger::JournalLog::new() {
        Ok(journal) => {
            let journal = journal.with_syslog_identifier("pincard".to_string());
            if log::set_boxed_logger(Box::new(FilteredJournal { inner: journal })).is_ok() {
                log::set_max_level(log::LevelFilter::Debug);
            }
        }
        Err(e) => eprintln!("journal logging unavailable: {}", e),
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let argv: Vec<String> = std::env::args().collect();
    let args = CaptureArgs::parse(&argv)?;

    let config_path = args.config.clone().unwrap_or_else(PincardConfig::default_path);
    let config = PincardConfig::load(&config_path);
    install_logger(&config);

    if let Some(token) = &args.store_token {
        keyring::store_token(&config.api_base_url, token).await?;
        println!("Token stored for {}", config.api_base_url);
        return Ok(());
    }

    let Some(link) = args.link.clone() else {
        eprintln!("{}", USAGE);
        std::process::exit(2);
    };

    let storage = Arc::new(FileStorage::new(&config.cache_dir));
    let cache = Arc::new(LocalCache::new(storage, config.snapshot_key.clone()));
    let store = Arc::new(DraftStore::new(cache.clone()).with_new_tab_urls(config.new_tab_urls.clone()));
    if store.seed_defaults().await? {
        log::info!("Seeded a fresh cache at {}", config.snapshot_path().display());
    }

    let metadata = (args.image.is_some()).then(|| PageMetadata {
        title: None,
        image_url: args.image.clone(),
    });
    let page = StaticPage {
        info: PageInfo {
            title: args.title.clone().unwrap_or_default(),
            link,
        },
        metadata,
    };
    store.capture(&page).await?;

    if let Some(description) = args.description.clone() {
        store.edit_draft(|d| d.description = description).await;
    }
    if let Some(location) = &args.location {
        let path = LocationPath::decode(location)
            .ok_or_else(|| format!("'{}' is not an org/board/list path", location))?;
        store.set_draft_location(path.clone()).await;
        if let Some(site) = &args.remember_site {
            store.remember_site_location(site, &path).await;
        }
    }

    let token = keyring::load_token(&config.api_base_url).await.unwrap_or_else(|e| {
        log::warn!("Keyring unavailable: {}", e);
        None
    });
    let client = match token {
        Some(token) if !config.api_key.is_empty() => Some(Arc::new(TrelloClient::new(
            &config.api_base_url,
            &config.api_key,
            &token,
        )?)),
        _ => None,
    };

    if let Some(client) = &client {
        match client.location_tree().await {
            Ok(tree) => {
                let path = store.draft().await.path();
                match tree.label(&path) {
                    Some(label) => println!("Filing under {}", label),
                    None if path.encode().is_empty() => println!("No location chosen yet"),
                    None => eprintln!("warning: location '{}' no longer exists", path.encode()),
                }
            }
            Err(e) => log::warn!("Could not refresh boards: {}", e),
        }
    }

    if !args.submit {
        cache.persist().await?;
        println!("{}", serde_json::to_string_pretty(&store.draft().await)?);
        return Ok(());
    }

    let Some(client) = client else {
        cache.persist().await?;
        return Err(format!(
            "no API key or token configured (see {} and --store-token)",
            config_path.display()
        )
        .into());
    };

    let mut pipeline = SubmissionPipeline::new(client, store.clone()).with_done_delay(config.done_delay());
    match pipeline.submit(SubmitTrigger::Button).await {
        Ok(SubmitOutcome::Blocked) => {
            cache.persist().await?;
            println!("Draft needs a title and a list before it can be submitted");
        }
        Ok(SubmitOutcome::Submitted(report)) => {
            println!("Created card {} ({} attachments)", report.card_id, report.attached);
            for error in &report.attachment_errors {
                eprintln!("attachment failed: {}", error);
            }
        }
        Err(e @ SubmitError::CardCreation(_)) => {
            // Keep the draft so the submission can be retried.
            cache.persist().await?;
            return Err(e.into());
        }
        Err(e) => return Err(e.into()),
    }

    Ok(())
}
