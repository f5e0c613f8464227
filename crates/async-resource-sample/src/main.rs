//! # User Directory Demo
//!
//! Drives the resource stores the way a UI would:
//!
//! 1. Starts a [`ResourceSystem`] whose profile cache lives in a JSON file, so
//!    a second run is served from disk.
//! 2. Watches and loads the profile, then renames the user.
//! 3. Looks up a few accounts (one of them unknown) and logs the summary.
//!
//! ```bash
//! RUST_LOG=info cargo run -p async-resource-sample
//! ```

use async_resource::storage::FileStorage;
use async_resource_sample::directory::Directory;
use async_resource_sample::lifecycle::{setup_tracing, ResourceSystem, SystemConfig};
use std::sync::Arc;
use std::time::Duration;
use tracing::{error, info, Instrument};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Setup tracing once for the entire application
    setup_tracing();

    let cache_path = std::env::temp_dir().join("async-resource-sample-cache.json");
    info!(cache = %cache_path.display(), "Starting user directory demo");

    let directory = Arc::new(Directory::seeded().with_latency(Duration::from_millis(50)));
    let config = SystemConfig {
        storage: Arc::new(FileStorage::new(&cache_path)),
        profile_refresh: Some(Duration::from_secs(30)),
        ..SystemConfig::default()
    };
    let system = ResourceSystem::with_config(Arc::clone(&directory), config).await;
    info!(from_cache = system.profile_from_cache(), "System started");

    let watch = system.profile_client.watch(|resource| {
        info!(
            loading = resource.loading,
            loaded = resource.loaded,
            updating = resource.updating,
            cache = resource.cache,
            name = ?resource.data.as_ref().map(|p| p.display_name()),
            "Profile changed"
        );
    });

    let span = tracing::info_span!("profile");
    async {
        let handle = system.profile_client.load().await?;
        let profile = system.profile_client.profile()?;
        info!(name = %profile.display_name(), "Profile loaded");

        let renamed = system.profile_client.rename("John").await?;
        info!(name = %renamed.display_name(), "Profile renamed");
        handle.stop();
        Ok::<_, Box<dyn std::error::Error>>(())
    }
    .instrument(span)
    .await?;
    watch.unsubscribe();

    let span = tracing::info_span!("accounts");
    async {
        let emails = ["bob@mail.com", "lucifer@mail.com", "nobody@mail.com"];
        let (bob, lucifer, nobody) = tokio::join!(
            system.accounts_client.load(emails[0]),
            system.accounts_client.load(emails[1]),
            system.accounts_client.load(emails[2]),
        );
        for handle in [bob?, lucifer?, nobody?] {
            handle.stop();
        }

        for email in emails {
            match system.accounts_client.account(email) {
                Ok(account) => info!(%email, owner = %account.owner, balance_cents = account.balance_cents, "Account"),
                Err(e) => error!(%email, error = %e, "Account unavailable"),
            }
        }
        let summary = system.accounts_client.summary();
        info!(loaded = summary.loaded, loading = summary.loading, error = ?summary.error, "Accounts summary");
        Ok::<_, Box<dyn std::error::Error>>(())
    }
    .instrument(span)
    .await?;

    info!(requests = directory.requests(), "Directory requests served");
    system.shutdown();

    info!("Application completed successfully");
    Ok(())
}
