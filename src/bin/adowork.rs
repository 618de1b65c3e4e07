use anyhow::{Context, Result};
use clap::Parser;
use serde::Serialize;
use serde_json::json;
use std::sync::Arc;

use adowork::{
    AzureDevOpsClient,
    cli::{Args, Commands, UsersCommand},
    config::{AdoConfig, ConfigStore, FileConfigStore},
    logging::{LogConfig, init_logging},
    models::WorkItemType,
    secret::{ENV_PAT, EnvSecretStore, KeyringSecretStore, SecretStore},
};

fn print_json<T: Serialize>(value: &T) -> Result<()> {
    let out = serde_json::to_string_pretty(value).context("Failed to serialize output")?;
    println!("{out}");
    Ok(())
}

/// `ADOWORK_PAT` wins over the keyring when set.
fn secret_store() -> Arc<dyn SecretStore> {
    match std::env::var(ENV_PAT) {
        Ok(pat) if !pat.is_empty() => Arc::new(EnvSecretStore::default()),
        _ => Arc::new(KeyringSecretStore::default()),
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let log_config = LogConfig::from_cli_and_env(
        args.log_level.as_deref(),
        args.log_file.as_deref(),
        args.log_format.as_deref(),
    );
    let _log_guard = init_logging(log_config);

    let config_store: Arc<dyn ConfigStore> = Arc::new(FileConfigStore::default_location()?);
    let secret_store = secret_store();
    let client = AzureDevOpsClient::with_stores(config_store.clone(), secret_store.clone())?;

    tracing::debug!(command = ?args.command, "Running command");

    match args.command {
        Commands::Configure(configure) => {
            let mut config = AdoConfig::new(configure.organization_url, configure.project);
            config.default_area_path = configure.default_area_path.filter(|p| !p.is_empty());
            config_store.set_config(config.clone())?;
            print_json(&config)?;
        }
        Commands::Pat(command) => {
            let keyring = KeyringSecretStore::default();
            let configured = command.run(&keyring, secret_store.as_ref())?;
            print_json(&json!({ "configured": configured }))?;
        }
        Commands::Test => {
            let result = client.test_connection().await;
            print_json(&result)?;
            if !result.success {
                std::process::exit(1);
            }
        }
        Commands::List(list) => {
            print_json(&client.list_work_items(&list.to_filters()).await?)?;
        }
        Commands::Show { id } => print_json(&client.get_work_item(id).await?)?,
        Commands::Children { id } => print_json(&client.list_children(id).await?)?,
        Commands::Create(create) => {
            let default_area = config_store.get_config().and_then(|c| c.default_area_path);
            let payload = create.to_payload(default_area.as_deref());
            print_json(&client.create_work_item(&payload).await?)?;
        }
        Commands::Update(update) => {
            print_json(&client.update_work_item(update.id, &update.to_patch()).await?)?;
        }
        Commands::SetParent { id, parent } => {
            print_json(&client.update_parent(id, parent).await?)?;
        }
        Commands::Parents { id } => {
            let item = client.get_work_item(id).await?;
            let child_ids: Vec<i64> = client
                .list_children(id)
                .await?
                .into_iter()
                .map(|c| c.id)
                .collect();
            let default_area = config_store.get_config().and_then(|c| c.default_area_path);
            let candidates = client
                .list_parent_candidates(
                    id,
                    &item.summary.work_item_type,
                    &child_ids,
                    default_area.as_deref(),
                )
                .await?;
            print_json(&candidates)?;
        }
        Commands::States { work_item_type } => {
            let work_item_type = WorkItemType::from(work_item_type);
            print_json(&client.get_work_item_type_states(&work_item_type).await?)?;
        }
        Commands::Iterations => print_json(&client.list_iterations().await?)?,
        Commands::Areas => print_json(&client.list_area_paths().await?)?,
        Commands::Users(command) => match command {
            UsersCommand::Search { query } => print_json(&client.search_users(&query).await?)?,
            UsersCommand::Project => print_json(&client.list_project_users().await?)?,
        },
        Commands::Whoami => print_json(&client.get_current_user().await?)?,
    }

    Ok(())
}
