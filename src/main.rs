//! rmine - command-line access to a Redmine instance.

use std::collections::BTreeMap;
use std::path::PathBuf;

use clap::{Parser, Subcommand};
use serde::Serialize;
use tracing::info;

use redmine_client::api::{auth, ApiError};
use redmine_client::error::{AppError, Result};
use redmine_client::{
    logging, Config, IssueDraft, IssueFilter, NewMembership, Profile, Query, RedmineClient,
};

#[derive(Debug, Parser)]
#[command(name = "rmine", version, about = "Work with Redmine from the terminal")]
struct Cli {
    /// Profile to use (defaults to REDMINE_HOST or the configured default).
    #[arg(long, global = true)]
    profile: Option<String>,

    /// Path to the configuration file.
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Perform requests as another user (admin API keys only).
    #[arg(long, global = true)]
    as_user: Option<String>,

    /// Log debug output to stderr as well as the log file.
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Show one issue as JSON.
    Issue {
        id: u32,
        /// Extra associations, e.g. "journals,attachments".
        #[arg(long)]
        include: Option<String>,
    },
    /// List issues.
    Issues {
        #[arg(long)]
        project: Option<String>,
        /// Saved query ID.
        #[arg(long, conflicts_with_all = ["project", "status", "tracker", "assigned_to", "updated_on", "filter"])]
        query: Option<u32>,
        /// Status filter ("open", "closed", "*" or an ID).
        #[arg(long)]
        status: Option<String>,
        #[arg(long)]
        tracker: Option<String>,
        #[arg(long)]
        assigned_to: Option<String>,
        #[arg(long)]
        updated_on: Option<String>,
        /// Extra KEY=VALUE filter; may be repeated.
        #[arg(long, value_parser = parse_key_val)]
        filter: Vec<(String, String)>,
        /// Print full JSON instead of one title per line.
        #[arg(long)]
        json: bool,
    },
    /// Create an issue.
    CreateIssue {
        project_id: u32,
        tracker_id: u32,
        subject: String,
        #[arg(long)]
        description: Option<String>,
        #[arg(long)]
        parent: Option<u32>,
        /// File to upload and attach; may be repeated.
        #[arg(long)]
        attach: Vec<PathBuf>,
    },
    /// Remove an issue's parent, keeping all other attributes.
    Unparent { id: u32 },
    /// Delete an issue.
    DeleteIssue { id: u32 },
    /// Show one project as JSON.
    Project { id: String },
    /// List projects.
    Projects {
        /// KEY=VALUE filter; may be repeated.
        #[arg(long, value_parser = parse_key_val)]
        filter: Vec<(String, String)>,
    },
    /// List a project's memberships.
    Memberships { project: String },
    /// Add a user or group to a project.
    AddMember {
        project: String,
        user_id: u32,
        #[arg(long = "role", required = true)]
        roles: Vec<u32>,
    },
    /// Upload a file and print its token.
    Upload { file: PathBuf },
    /// Manage profiles.
    Profile {
        #[command(subcommand)]
        action: ProfileAction,
    },
}

#[derive(Debug, Subcommand)]
enum ProfileAction {
    /// Add a profile, storing its API key in the OS keyring.
    Add {
        name: String,
        url: String,
        #[arg(long)]
        api_key: Option<String>,
        #[arg(long)]
        page_limit: Option<u32>,
        /// Make this the default profile.
        #[arg(long)]
        default: bool,
    },
    /// List profiles.
    List,
    /// Remove a profile and its stored API key.
    Remove { name: String },
}

fn parse_key_val(s: &str) -> std::result::Result<(String, String), String> {
    let (key, value) = s
        .split_once('=')
        .ok_or_else(|| format!("expected KEY=VALUE, got '{}'", s))?;
    Ok((key.to_string(), value.to_string()))
}

fn print_json<T: Serialize>(value: &T) -> Result<()> {
    let out = serde_json::to_string_pretty(value).map_err(ApiError::Serialization)?;
    println!("{}", out);
    Ok(())
}

fn load_config(path: Option<&PathBuf>) -> Result<Config> {
    Ok(match path {
        Some(path) => Config::load_from(path)?,
        None => Config::load()?,
    })
}

fn save_config(config: &Config, path: Option<&PathBuf>) -> Result<()> {
    match path {
        Some(path) => config.save_to(path)?,
        None => config.save()?,
    }
    Ok(())
}

fn connect(cli: &Cli, config: &Config) -> Result<RedmineClient> {
    let profile = config.resolve_profile(cli.profile.as_deref())?;
    let client = RedmineClient::new(&profile, &config.settings)?;
    Ok(match &cli.as_user {
        Some(login) => client.acting_as(login),
        None => client,
    })
}

async fn run(cli: Cli) -> Result<()> {
    let mut config = load_config(cli.config.as_ref())?;

    if let Command::Profile { action } = &cli.command {
        return run_profile(action, &mut config, cli.config.as_ref());
    }

    let client = connect(&cli, &config)?;

    match cli.command {
        Command::Issue { id, include } => {
            let args = match include {
                Some(include) => Query::new().with("include", include),
                None => Query::new(),
            };
            print_json(&client.issue_with_args(id, args).await?)
        }
        Command::Issues {
            project,
            query,
            status,
            tracker,
            assigned_to,
            updated_on,
            filter,
            json,
        } => {
            let issues = match query {
                Some(query_id) => client.issues_by_query(query_id).await?,
                None => {
                    let filter = IssueFilter {
                        project_id: project,
                        status_id: status,
                        tracker_id: tracker,
                        assigned_to_id: assigned_to,
                        updated_on,
                        extra_filters: filter.into_iter().collect(),
                        ..Default::default()
                    };
                    client.issues_by_filter(&filter).await?
                }
            };
            if json {
                print_json(&issues)
            } else {
                for issue in &issues {
                    println!("{}", issue.title());
                }
                Ok(())
            }
        }
        Command::CreateIssue {
            project_id,
            tracker_id,
            subject,
            description,
            parent,
            attach,
        } => {
            let mut draft = IssueDraft::new(project_id, tracker_id, subject);
            draft.description = description;
            draft.parent_issue_id = parent;
            for path in &attach {
                draft.uploads.push(client.upload_file(path).await?);
            }
            let issue = client.create_issue(&draft).await?;
            println!("{}", issue.title());
            Ok(())
        }
        Command::Unparent { id } => {
            let mut issue = client.issue(id).await?;
            issue.fields.parent = None;
            client.save_issue(&issue).await?;
            println!("{}", issue.title());
            Ok(())
        }
        Command::DeleteIssue { id } => {
            client.delete_issue(id).await?;
            info!(issue_id = id, "Issue deleted from CLI");
            Ok(())
        }
        Command::Project { id } => print_json(&client.project(&id).await?),
        Command::Projects { filter } => {
            let projects = if filter.is_empty() {
                client.projects().await?
            } else {
                let filters: BTreeMap<String, String> = filter.into_iter().collect();
                client.projects_by_filter(&filters).await?
            };
            for project in &projects {
                println!("{}\t{}", project.id, project);
            }
            Ok(())
        }
        Command::Memberships { project } => print_json(&client.memberships(&project).await?),
        Command::AddMember {
            project,
            user_id,
            roles,
        } => {
            let membership = client
                .create_membership(
                    &project,
                    &NewMembership {
                        user_id,
                        role_ids: roles,
                    },
                )
                .await?;
            print_json(&membership)
        }
        Command::Upload { file } => {
            let upload = client.upload_file(&file).await?;
            println!("{}", upload.token);
            Ok(())
        }
        Command::Profile { .. } => Err(AppError::other("profile commands are handled above")),
    }
}

fn run_profile(action: &ProfileAction, config: &mut Config, path: Option<&PathBuf>) -> Result<()> {
    match action {
        ProfileAction::Add {
            name,
            url,
            api_key,
            page_limit,
            default,
        } => {
            let mut profile = Profile::new(name.clone(), url.clone());
            profile.page_limit = *page_limit;
            config.add_profile(profile)?;
            if *default {
                config.settings.default_profile = Some(name.clone());
            }
            if let Some(key) = api_key {
                auth::store_api_key(name, key)?;
            }
            save_config(config, path)?;
            println!("Added profile '{}'", name);
        }
        ProfileAction::List => {
            for profile in &config.profiles {
                let marker = if config.settings.default_profile.as_deref() == Some(&profile.name)
                {
                    "*"
                } else {
                    " "
                };
                println!("{} {}\t{}", marker, profile.name, profile.url);
            }
        }
        ProfileAction::Remove { name } => {
            config.remove_profile(name)?;
            save_config(config, path)?;
            if let Err(e) = auth::delete_api_key(name) {
                tracing::warn!("Could not delete stored API key: {}", e);
            }
            println!("Removed profile '{}'", name);
        }
    }
    Ok(())
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    if let Err(e) = logging::init(cli.verbose) {
        eprintln!("warning: logging disabled: {}", e);
    }

    if let Err(err) = run(cli).await {
        tracing::error!("Command failed: {}", err);
        eprintln!("error: {}", err.user_message());
        if let Some(action) = err.suggested_action() {
            eprintln!("hint: {}", action);
        }
        if let Some(dir) = logging::log_directory() {
            eprintln!("logs: {}", dir.display());
        }
        std::process::exit(err.exit_code());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition_is_valid() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_parse_key_val() {
        assert_eq!(
            parse_key_val("cf_1=yes=no").unwrap(),
            ("cf_1".to_string(), "yes=no".to_string())
        );
        assert!(parse_key_val("novalue").is_err());
    }

    #[test]
    fn test_issues_command_parses_filters() {
        let cli = Cli::try_parse_from([
            "rmine", "issues", "--project", "web", "--status", "*", "--filter", "cf_2=x",
        ])
        .unwrap();
        match cli.command {
            Command::Issues {
                project, filter, ..
            } => {
                assert_eq!(project.as_deref(), Some("web"));
                assert_eq!(filter, vec![("cf_2".to_string(), "x".to_string())]);
            }
            other => panic!("unexpected command {:?}", other),
        }
    }

    #[test]
    fn test_query_conflicts_with_filters() {
        let result = Cli::try_parse_from(["rmine", "issues", "--query", "3", "--status", "*"]);
        assert!(result.is_err());
    }

    #[test]
    fn test_query_conflicts_with_project() {
        let result = Cli::try_parse_from(["rmine", "issues", "--query", "3", "--project", "web"]);
        assert!(result.is_err());

        let cli = Cli::try_parse_from(["rmine", "issues", "--query", "3"]).unwrap();
        assert!(matches!(cli.command, Command::Issues { query: Some(3), .. }));
    }
}
