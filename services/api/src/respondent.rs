use crate::console::{Console, SessionEnd};
use clap::Args;
use hillia::config::{AppConfig, QuestionnaireConfig};
use hillia::error::AppError;
use hillia::questionnaire::{
    AnalyticsEvent, AnalyticsSink, ContactDesk, ContactForm, EventType, FileStorage,
    HttpAnalytics, HttpSubmissionAdapter, NoopAnalytics, PreferredContact, QuestionCatalog,
    QuestionKind, ResponseStore, SiteState, StateStorage, SubmissionAdapter, Wizard,
    WizardContext, WizardSettings,
};
use hillia::telemetry::{self, LogTarget};
use std::path::PathBuf;
use std::sync::Arc;
use tokio::io::BufReader;

#[derive(Args, Debug, Default)]
pub(crate) struct ClientArgs {
    /// Reading-room base URL (defaults to HILLIA_BACKEND_URL)
    #[arg(long)]
    pub(crate) backend_url: Option<String>,
    /// Directory holding answers and progress between runs (defaults to HILLIA_STATE_DIR)
    #[arg(long)]
    pub(crate) state_dir: Option<PathBuf>,
    /// Do not send usage events
    #[arg(long)]
    pub(crate) no_analytics: bool,
}

#[derive(Args, Debug)]
pub(crate) struct ContactArgs {
    #[command(flatten)]
    pub(crate) client: ClientArgs,
    #[arg(long)]
    pub(crate) name: String,
    /// Why you would like a conversation
    #[arg(long)]
    pub(crate) reason: String,
    #[arg(long, default_value = "")]
    pub(crate) city: String,
    /// email, phone, whatsapp or "no preference"
    #[arg(long, value_parser = parse_preferred)]
    pub(crate) preferred: Option<PreferredContact>,
    #[arg(long)]
    pub(crate) email: Option<String>,
    #[arg(long)]
    pub(crate) phone: Option<String>,
}

#[derive(Args, Debug, Default)]
pub(crate) struct CatalogArgs {
    /// Print the catalog as JSON instead of an outline
    #[arg(long)]
    pub(crate) json: bool,
}

fn parse_preferred(raw: &str) -> Result<PreferredContact, String> {
    PreferredContact::from_label(raw).ok_or_else(|| {
        format!("unknown contact method '{raw}' (email, phone, whatsapp, no preference)")
    })
}

struct Client {
    storage: Arc<dyn StateStorage>,
    adapter: Arc<dyn SubmissionAdapter>,
    analytics: Arc<dyn AnalyticsSink>,
    settings: WizardSettings,
}

fn client(args: ClientArgs) -> Result<Client, AppError> {
    let config = AppConfig::load()?;
    telemetry::init_with_target(&config.telemetry, LogTarget::Stderr)?;

    let QuestionnaireConfig {
        backend_url,
        state_dir,
        ..
    } = &config.questionnaire;
    let backend_url = args.backend_url.unwrap_or_else(|| backend_url.clone());
    let state_dir = args.state_dir.unwrap_or_else(|| state_dir.clone());
    let settings = WizardSettings::from(&config.questionnaire);

    let adapter = HttpSubmissionAdapter::new(backend_url.clone(), settings.submit_timeout)?;
    let analytics: Arc<dyn AnalyticsSink> = if args.no_analytics {
        Arc::new(NoopAnalytics)
    } else {
        Arc::new(HttpAnalytics::new(reqwest::Client::new(), &backend_url))
    };

    tracing::debug!(%backend_url, state_dir = %state_dir.display(), "questionnaire client configured");

    Ok(Client {
        storage: Arc::new(FileStorage::new(state_dir)),
        adapter: Arc::new(adapter),
        analytics,
        settings,
    })
}

pub(crate) async fn run_questionnaire(args: ClientArgs) -> Result<(), AppError> {
    let client = client(args)?;
    let site = SiteState::new(client.storage.clone());

    if !site.has_entered() {
        site.mark_entered()?;
        client
            .analytics
            .track(AnalyticsEvent::new(EventType::HomepageEntry, site.session_id()));
    }

    let context = WizardContext {
        store: ResponseStore::new(client.storage.clone()),
        site,
        adapter: client.adapter,
        analytics: client.analytics,
    };
    let mut wizard = Wizard::resume(Arc::new(QuestionCatalog::hillia()), context, client.settings);

    let input = BufReader::new(tokio::io::stdin());
    let mut console = Console::new(input, std::io::stdout());
    match console.run(&mut wizard).await? {
        SessionEnd::Completed(acknowledgement) => {
            tracing::info!(
                response_id = %acknowledgement.response_id,
                local = acknowledgement.is_local(),
                "questionnaire session completed"
            );
        }
        SessionEnd::Paused => tracing::info!("questionnaire session paused"),
        SessionEnd::AlreadySubmitted => tracing::info!("questionnaire already submitted"),
    }
    Ok(())
}

pub(crate) async fn run_contact(args: ContactArgs) -> Result<(), AppError> {
    let ContactArgs {
        client: client_args,
        name,
        reason,
        city,
        preferred,
        email,
        phone,
    } = args;
    let client = client(client_args)?;

    let mut form = ContactForm::new(name, reason);
    form.city = city;
    form.email = email;
    form.phone = phone;
    if preferred.is_some() {
        form.prefer(preferred);
    }

    let desk = ContactDesk::new(
        client.adapter,
        client.analytics,
        SiteState::new(client.storage),
        client.settings.submit_timeout,
    );
    let acknowledgement = desk.submit(&form).await?;

    if acknowledgement.is_local() {
        println!("The reading room could not be reached; your request was kept on this device.");
    } else {
        println!("Request received ({}).", acknowledgement.submission_id);
    }
    Ok(())
}

pub(crate) fn run_catalog(args: CatalogArgs) -> Result<(), AppError> {
    let catalog = QuestionCatalog::hillia();
    if args.json {
        let rendered = serde_json::to_string_pretty(&catalog)
            .map_err(|err| std::io::Error::new(std::io::ErrorKind::InvalidData, err))?;
        println!("{rendered}");
        return Ok(());
    }

    println!("{}", render_outline(&catalog));
    Ok(())
}

fn render_outline(catalog: &QuestionCatalog) -> String {
    let mut lines = vec![
        catalog.title.to_string(),
        format!("{} questions", catalog.total_questions()),
    ];
    for section in catalog.sections() {
        let optional = if section.optional { " (optional)" } else { "" };
        lines.push(format!("{} {}{}", section.label, section.title, optional));
        for question in &section.questions {
            let detail = match question.kind {
                QuestionKind::Multiselect => format!("multi-select, up to {}", question.selection_cap()),
                kind => kind.label().to_string(),
            };
            lines.push(format!("  {} [{}] {}", question.id, detail, question.prompt));
        }
    }
    lines.push(format!("{} {}", catalog.contact.label, catalog.contact.title));
    lines.join("\n")
}
