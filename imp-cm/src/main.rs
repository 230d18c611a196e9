//! imp-cm (Campaign Manager) - command-line front end
//!
//! Browses contacts, campaign members and ranked matches through a
//! [`CampaignSession`], applies bulk stage changes and edits agent prompts.

use std::io::{self, BufRead, Write};
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{bail, Context, Result};
use clap::{Args, Parser, Subcommand, ValueEnum};
use imp_cm::api::{ApiClient, ApiConfig, PromptStoreClient};
use imp_cm::cache::ViewCaches;
use imp_cm::filter::{ContactFilter, MatchMode, StageCountRange};
use imp_cm::mutation::{Confirmer, MutationOutcome, StageAction, StageMutationCoordinator};
use imp_cm::reconcile::ViewMode;
use imp_cm::selection::SelectionSet;
use imp_cm::sources::{ContactSource, MatchSource};
use imp_cm::{CampaignSession, SessionOptions, Sources, ViewSnapshot};
use imp_common::config::{resolve_config, Overrides, TomlConfig};
use imp_common::contact::{CampaignSortField, ContactSortField, ContactType, SortDirection};
use imp_common::prompts::{PromptDraft, PromptFilters};
use imp_common::CampaignStatus;
use tokio::sync::Mutex;
use tracing::info;

/// Command-line arguments for imp-cm
#[derive(Parser, Debug)]
#[command(name = "imp-cm")]
#[command(about = "Campaign manager for the investor match portal")]
#[command(version)]
struct Cli {
    /// Config file (default: ~/.config/imp/config.toml)
    #[arg(long, global = true, env = "IMP_CONFIG")]
    config: Option<PathBuf>,

    /// Portal API base URL
    #[arg(long, global = true)]
    api_url: Option<String>,

    /// Bearer token for the portal API
    #[arg(long, global = true)]
    token: Option<String>,

    /// Prompt database URL
    #[arg(long, global = true)]
    db_url: Option<String>,

    /// Prompt database service key
    #[arg(long, global = true)]
    db_key: Option<String>,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, global = true)]
    log_level: Option<String>,

    /// Rows per page
    #[arg(long, global = true)]
    page_size: Option<usize>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// List all contacts
    Contacts {
        #[command(flatten)]
        filters: FilterArgs,
        #[arg(long, value_enum, default_value_t = ContactSortArg::UpdatedAt)]
        sort: ContactSortArg,
        #[arg(long, value_enum, default_value_t = DirectionArg::Desc)]
        direction: DirectionArg,
        /// Page index (0-based)
        #[arg(long, default_value_t = 0)]
        page: usize,
        /// Campaign owner whose stages are shown
        #[arg(long, default_value = "")]
        owner: String,
    },
    /// List the contacts of a campaign
    Campaign {
        #[arg(long)]
        owner: String,
        #[command(flatten)]
        filters: FilterArgs,
        #[arg(long, value_enum, default_value_t = CampaignSortArg::Stage)]
        sort: CampaignSortArg,
        #[arg(long, value_enum, default_value_t = DirectionArg::Asc)]
        direction: DirectionArg,
        #[arg(long, default_value_t = 0)]
        page: usize,
    },
    /// List ranked match candidates of a campaign owner
    Matches {
        #[arg(long)]
        owner: String,
        /// Candidate contact type
        #[arg(long = "type")]
        target_type: ContactType,
        #[command(flatten)]
        filters: FilterArgs,
        #[arg(long, default_value_t = 0)]
        page: usize,
    },
    /// Move contacts to a stage (asks for confirmation)
    Stage {
        #[arg(long)]
        owner: String,
        #[arg(long)]
        stage: CampaignStatus,
        /// Skip the confirmation prompt
        #[arg(long)]
        yes: bool,
        #[arg(required = true)]
        ids: Vec<String>,
    },
    /// Set the stage of a single contact
    SetStage {
        #[arg(long)]
        owner: String,
        #[arg(long)]
        stage: CampaignStatus,
        /// Skip the confirmation prompt
        #[arg(long)]
        yes: bool,
        id: String,
    },
    /// Add contacts to a campaign as prospects
    Add {
        #[arg(long)]
        owner: String,
        #[arg(required = true)]
        ids: Vec<String>,
    },
    /// Remove contacts from a campaign
    Remove {
        #[arg(long)]
        owner: String,
        #[arg(required = true)]
        ids: Vec<String>,
    },
    /// Per-stage counts of a campaign
    Summary {
        #[arg(long)]
        owner: String,
    },
    /// Show one contact
    Show {
        id: String,
        /// Also show the campaign analysis against this contact type
        #[arg(long)]
        analysis: Option<ContactType>,
    },
    /// Agent prompt store
    Prompts {
        #[command(subcommand)]
        command: PromptCommand,
    },
}

#[derive(Subcommand, Debug)]
enum PromptCommand {
    List {
        #[arg(long)]
        agent: Option<String>,
        #[arg(long = "type")]
        prompt_type: Option<String>,
        #[arg(long)]
        language: Option<String>,
    },
    Save {
        #[arg(long)]
        agent: String,
        #[arg(long = "type")]
        prompt_type: String,
        #[arg(long)]
        language: Option<String>,
        /// File holding the prompt text
        #[arg(long)]
        file: PathBuf,
        #[arg(long)]
        updated_by: Option<String>,
    },
}

#[derive(Args, Debug, Default)]
struct FilterArgs {
    #[arg(long)]
    contact_type: Option<ContactType>,
    #[arg(long)]
    country: Option<String>,
    #[arg(long)]
    city: Option<String>,
    #[arg(long = "industry")]
    industries: Vec<String>,
    #[arg(long = "skill")]
    skills: Vec<String>,
    #[arg(long = "role")]
    roles: Vec<String>,
    #[arg(long = "funding-stage")]
    funding_stages: Vec<String>,
    #[arg(long = "vertical")]
    verticals: Vec<String>,
    #[arg(long = "product-type")]
    product_types: Vec<String>,
    #[arg(long = "seniority")]
    seniority_levels: Vec<String>,
    /// Require every listed value instead of any
    #[arg(long)]
    match_all: bool,
    /// Only contacts at this campaign stage
    #[arg(long)]
    status: Option<CampaignStatus>,
    /// Minimum per-stage count, as STAGE=N
    #[arg(long = "min-count", value_parser = parse_stage_bound)]
    min_counts: Vec<(CampaignStatus, u64)>,
    /// Maximum per-stage count, as STAGE=N
    #[arg(long = "max-count", value_parser = parse_stage_bound)]
    max_counts: Vec<(CampaignStatus, u64)>,
}

impl FilterArgs {
    fn into_filter(self) -> ContactFilter {
        let mut filter = ContactFilter {
            contact_type: self.contact_type,
            location_country: self.country,
            location_city: self.city,
            industries: self.industries,
            skills: self.skills,
            roles: self.roles,
            funding_stages: self.funding_stages,
            verticals: self.verticals,
            product_types: self.product_types,
            seniority_levels: self.seniority_levels,
            match_mode: if self.match_all {
                MatchMode::All
            } else {
                MatchMode::Any
            },
            campaign_status: self.status,
            ..Default::default()
        };
        for (stage, min) in self.min_counts {
            filter
                .stage_count_filters
                .entry(stage)
                .or_insert_with(StageCountRange::default)
                .min = Some(min);
        }
        for (stage, max) in self.max_counts {
            filter
                .stage_count_filters
                .entry(stage)
                .or_insert_with(StageCountRange::default)
                .max = Some(max);
        }
        filter
    }
}

fn parse_stage_bound(raw: &str) -> std::result::Result<(CampaignStatus, u64), String> {
    let (stage, count) = raw
        .split_once('=')
        .ok_or_else(|| format!("expected STAGE=N, got {raw:?}"))?;
    let stage = stage.parse::<CampaignStatus>().map_err(|e| e.to_string())?;
    let count = count
        .trim()
        .parse::<u64>()
        .map_err(|e| format!("invalid count {count:?}: {e}"))?;
    Ok((stage, count))
}

#[derive(ValueEnum, Clone, Copy, Debug)]
enum ContactSortArg {
    UpdatedAt,
    CreatedAt,
    FullName,
    ContactType,
}

impl From<ContactSortArg> for ContactSortField {
    fn from(arg: ContactSortArg) -> Self {
        match arg {
            ContactSortArg::UpdatedAt => ContactSortField::UpdatedAt,
            ContactSortArg::CreatedAt => ContactSortField::CreatedAt,
            ContactSortArg::FullName => ContactSortField::FullName,
            ContactSortArg::ContactType => ContactSortField::ContactType,
        }
    }
}

#[derive(ValueEnum, Clone, Copy, Debug)]
enum CampaignSortArg {
    Stage,
    UpdatedAt,
}

impl From<CampaignSortArg> for CampaignSortField {
    fn from(arg: CampaignSortArg) -> Self {
        match arg {
            CampaignSortArg::Stage => CampaignSortField::Stage,
            CampaignSortArg::UpdatedAt => CampaignSortField::UpdatedAt,
        }
    }
}

#[derive(ValueEnum, Clone, Copy, Debug)]
enum DirectionArg {
    Asc,
    Desc,
}

impl From<DirectionArg> for SortDirection {
    fn from(arg: DirectionArg) -> Self {
        match arg {
            DirectionArg::Asc => SortDirection::Asc,
            DirectionArg::Desc => SortDirection::Desc,
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let overrides = Overrides {
        config_path: cli.config.clone(),
        api_base_url: cli.api_url.clone(),
        api_token: cli.token.clone(),
        db_url: cli.db_url.clone(),
        db_service_key: cli.db_key.clone(),
        log_level: cli.log_level.clone(),
        page_size: cli.page_size,
    };
    let config = resolve_config(&overrides).context("Failed to load configuration")?;

    // RUST_LOG wins over the configured level
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(&config.logging.level)),
        )
        .with_writer(io::stderr)
        .init();

    info!(
        "Starting IMP Campaign Manager (imp-cm) v{} [{}] built {} ({})",
        env!("CARGO_PKG_VERSION"),
        env!("GIT_HASH"),
        env!("BUILD_TIMESTAMP"),
        env!("BUILD_PROFILE")
    );
    info!("API base URL: {}", config.api.base_url);

    run(&config, cli.command).await
}

async fn run(config: &TomlConfig, command: Command) -> Result<()> {
    let client = Arc::new(
        ApiClient::new(&ApiConfig::from_section(&config.api))
            .context("Failed to build API client")?,
    );
    let sources = Sources::from_client(client.clone());
    let options =
        SessionOptions::from_config(&config.campaign).context("Invalid campaign settings")?;

    match command {
        Command::Contacts {
            filters,
            sort,
            direction,
            page,
            owner,
        } => {
            let mut session =
                CampaignSession::new(owner, ContactType::Investor, sources, options);
            session.apply_filters(filters.into_filter());
            session.set_all_sort(sort.into(), direction.into());
            let snapshot = load_page(&mut session, page).await?;
            print_snapshot(&snapshot);
        }
        Command::Campaign {
            owner,
            filters,
            sort,
            direction,
            page,
        } => {
            let mut session =
                CampaignSession::new(owner, ContactType::Investor, sources, options);
            session.set_view_mode(ViewMode::Campaign);
            session.apply_filters(filters.into_filter());
            session.set_campaign_sort(sort.into(), direction.into());
            let snapshot = load_page(&mut session, page).await?;
            println!("Campaign members: {}", session.campaign_total());
            print_snapshot(&snapshot);
        }
        Command::Matches {
            owner,
            target_type,
            filters,
            page,
        } => {
            let mut session = CampaignSession::new(owner, target_type, sources, options);
            session.set_view_mode(ViewMode::Matches);
            session.apply_filters(filters.into_filter());
            let snapshot = load_page(&mut session, page).await?;
            print_snapshot(&snapshot);
        }
        Command::Stage {
            owner,
            stage,
            yes,
            ids,
        } => {
            let confirm = move |stage: CampaignStatus, count: usize| yes || ask(stage, count);
            mutate(sources, owner, StageAction::ChangeStage(stage), ids, &confirm).await?;
        }
        Command::SetStage {
            owner,
            stage,
            yes,
            id,
        } => {
            if !yes && !ask(stage, 1) {
                println!("Cancelled");
                return Ok(());
            }
            let caches = Arc::new(Mutex::new(ViewCaches::default()));
            let coordinator = StageMutationCoordinator::new(owner, sources.membership, caches);
            let outcome = coordinator.apply_one(&id, stage).await?;
            report(outcome);
        }
        Command::Add { owner, ids } => {
            let accept = |_: CampaignStatus, _: usize| true;
            mutate(sources, owner, StageAction::AddToCampaign, ids, &accept).await?;
        }
        Command::Remove { owner, ids } => {
            let accept = |_: CampaignStatus, _: usize| true;
            mutate(sources, owner, StageAction::RemoveFromCampaign, ids, &accept).await?;
        }
        Command::Summary { owner } => {
            let session = CampaignSession::new(owner, ContactType::Investor, sources, options);
            let summary = session.stage_summary().await?;
            for (stage, count) in summary.iter() {
                println!("{:<16} {}", stage.label(), count);
            }
            println!("{:<16} {}", "total", summary.total());
        }
        Command::Show { id, analysis } => {
            let contact = client.get_contact(&id).await?;
            let quality = contact.quality_score();
            println!("{} ({})", contact.full_name, contact.id);
            println!("  type:     {}", contact.contact_type);
            println!("  headline: {}", contact.headline);
            println!(
                "  location: {}, {}",
                contact.location_city, contact.location_country
            );
            match quality.score5 {
                Some(score) => println!("  quality:  {score}/5"),
                None => println!("  quality:  n/a"),
            }
            if let Some(target_type) = analysis {
                let analysis = client.campaign_analysis(&id, target_type).await?;
                for combination in analysis.combinations {
                    println!(
                        "  {:>5} matches: {}",
                        combination.match_count,
                        combination.attributes.join(" + ")
                    );
                }
            }
        }
        Command::Prompts { command } => run_prompts(config, command).await?,
    }
    Ok(())
}

/// Load page 0, then walk forward to `page`
async fn load_page(session: &mut CampaignSession, page: usize) -> Result<ViewSnapshot> {
    let mut snapshot = session.load().await?;
    while session.page() < page {
        if !session.next_page() {
            bail!("page {page} is past the last page ({})", session.page());
        }
        snapshot = session.load().await?;
    }
    Ok(snapshot)
}

async fn mutate(
    sources: Sources,
    owner: String,
    action: StageAction,
    ids: Vec<String>,
    confirm: &dyn Confirmer,
) -> Result<()> {
    let caches = Arc::new(Mutex::new(ViewCaches::default()));
    let coordinator = StageMutationCoordinator::new(owner, sources.membership, caches);
    let mut selection = SelectionSet::new();
    for id in &ids {
        selection.toggle(id);
    }

    let outcome = coordinator.apply(action, &mut selection, confirm).await?;
    report(outcome);
    Ok(())
}

fn report(outcome: MutationOutcome) {
    match outcome {
        MutationOutcome::Applied {
            updated,
            stage,
            membership,
        } => {
            println!("Moved {updated} contact(s) to {}", stage.label());
            if let Some(membership) = membership {
                println!("Campaign now has {} member(s)", membership.member_ids().len());
            }
        }
        MutationOutcome::Declined => println!("Cancelled"),
        MutationOutcome::EmptySelection => println!("Nothing selected"),
        MutationOutcome::Busy => println!("Another stage change is in progress"),
    }
}

fn ask(stage: CampaignStatus, count: usize) -> bool {
    print!("Move {count} contact(s) to {}? [y/N] ", stage.label());
    if io::stdout().flush().is_err() {
        return false;
    }
    let mut answer = String::new();
    if io::stdin().lock().read_line(&mut answer).is_err() {
        return false;
    }
    matches!(answer.trim().to_ascii_lowercase().as_str(), "y" | "yes")
}

async fn run_prompts(config: &TomlConfig, command: PromptCommand) -> Result<()> {
    let store = PromptStoreClient::from_config(&config.database, &config.api)
        .context("Prompt store is not configured")?;

    match command {
        PromptCommand::List {
            agent,
            prompt_type,
            language,
        } => {
            let prompts = store
                .list(&PromptFilters {
                    agent_name: agent,
                    prompt_type,
                    language,
                })
                .await?;
            for prompt in prompts {
                println!(
                    "{} / {} [{}] updated {}{}",
                    prompt.agent_name,
                    prompt.prompt_type,
                    prompt.language,
                    prompt.updated_at,
                    prompt
                        .updated_by
                        .map(|by| format!(" by {by}"))
                        .unwrap_or_default()
                );
            }
        }
        PromptCommand::Save {
            agent,
            prompt_type,
            language,
            file,
            updated_by,
        } => {
            let content = std::fs::read_to_string(&file)
                .with_context(|| format!("Failed to read {}", file.display()))?;
            let saved = store
                .save(PromptDraft {
                    agent_name: agent,
                    prompt_type,
                    language,
                    content,
                    updated_by,
                })
                .await?;
            println!(
                "Saved {} / {} [{}] at {}",
                saved.agent_name, saved.prompt_type, saved.language, saved.updated_at
            );
        }
    }
    Ok(())
}

fn print_snapshot(snapshot: &ViewSnapshot) {
    for row in &snapshot.rows {
        let quality = row
            .quality
            .score5
            .map(|s| s.to_string())
            .unwrap_or_else(|| "-".to_string());
        let score = row
            .match_meta
            .as_ref()
            .map(|meta| format!(" score {:.2}", meta.score))
            .unwrap_or_default();
        println!(
            "{:<24} {:<32} {:<16} q{}{}",
            row.contact.id,
            row.contact.full_name,
            row.status.label(),
            quality,
            score
        );
    }

    let total = match snapshot.total {
        Some(imp_cm::pagination::PageTotal::Exact(n)) => n.to_string(),
        Some(imp_cm::pagination::PageTotal::AtLeast(n)) => format!("{n}+"),
        None => "?".to_string(),
    };
    println!(
        "page {} ({} per page), {} total{}",
        snapshot.page,
        snapshot.page_size,
        total,
        if snapshot.has_more { ", more available" } else { "" }
    );

    let stages: Vec<String> = snapshot
        .stage_distribution
        .iter()
        .filter(|(_, count)| *count > 0)
        .map(|(stage, count)| format!("{}={}", stage, count))
        .collect();
    if !stages.is_empty() {
        println!("stages: {}", stages.join(" "));
    }
    if let Some(error) = &snapshot.error {
        eprintln!("error: {error}");
    }
}
