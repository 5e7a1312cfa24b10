use std::sync::Arc;

use clap::Args;
use jobboard::config::IntegrityConfig;
use jobboard::error::AppError;
use jobboard::marketplace::{
    Application, ApplicationStatus, ChatStore, InMemoryStore, Marketplace, MarketplaceError,
    PostingStore,
};

use crate::infra::{seed_demo_directory, DemoDirectory, Market};

#[derive(Args, Debug, Default)]
pub(crate) struct DemoArgs {
    /// Print the JSON payloads the HTTP routes would return.
    #[arg(long)]
    pub(crate) json: bool,
    /// Stop before the employer account deletion step.
    #[arg(long)]
    pub(crate) skip_deletion: bool,
}

pub(crate) async fn run_demo(args: DemoArgs) -> Result<(), AppError> {
    let store = Arc::new(InMemoryStore::new());
    let directory = seed_demo_directory(&store).await?;
    let market = Marketplace::new(store.clone(), IntegrityConfig::default());

    println!("Job marketplace demo");
    println!(
        "  Seeker {} applies to \"{}\" posted by {}",
        directory.seeker.name, directory.posting.title, directory.employer.name
    );

    let application = demo_submit(&market, &store, &directory, &args).await?;
    demo_duplicate(&market, &directory).await?;
    demo_review(&market, &directory, &application, &args).await?;
    demo_rival(&market, &directory, &application).await?;

    if args.skip_deletion {
        println!("Account deletion skipped");
        return Ok(());
    }
    demo_deletion(&market, &store, &directory, &args).await
}

async fn demo_submit(
    market: &Market,
    store: &InMemoryStore,
    directory: &DemoDirectory,
    args: &DemoArgs,
) -> Result<Application, AppError> {
    println!("\n[1] Submit application");
    let application = market
        .applications
        .submit_application(&directory.seeker.id, &directory.posting.id)
        .await?;
    println!(
        "  Application {} stored as {} (chat started: {})",
        application.id, application.status, application.chat_started
    );

    let linked = store
        .posting(&directory.posting.id)
        .await
        .map_err(MarketplaceError::from)?
        .map(|posting| posting.applications.contains(&application.id))
        .unwrap_or(false);
    println!("  Posting application set updated: {linked}");

    match store
        .chat_thread_for_application(&application.id)
        .await
        .map_err(MarketplaceError::from)?
    {
        Some(thread) => println!("  Chat thread {} opened", thread.id),
        None => println!("  Chat thread pending reconciliation"),
    }

    if args.json {
        let listing = market
            .applications
            .applications_for_seeker(&directory.seeker.id)
            .await?;
        print_json("  Seeker listing", &listing);
    }
    Ok(application)
}

async fn demo_duplicate(market: &Market, directory: &DemoDirectory) -> Result<(), AppError> {
    println!("\n[2] Submit the same application again");
    match market
        .applications
        .submit_application(&directory.seeker.id, &directory.posting.id)
        .await
    {
        Ok(application) => println!("  Unexpectedly accepted as {}", application.id),
        Err(err @ MarketplaceError::Conflict(_)) => println!("  Rejected: {err}"),
        Err(other) => return Err(other.into()),
    }
    Ok(())
}

async fn demo_review(
    market: &Market,
    directory: &DemoDirectory,
    application: &Application,
    args: &DemoArgs,
) -> Result<(), AppError> {
    println!("\n[3] Employer accepts the application");
    let accepted = market
        .applications
        .transition_status(
            &directory.employer.id,
            &application.id,
            ApplicationStatus::Accepted,
        )
        .await?;
    println!(
        "  Status {} (chat started: {})",
        accepted.status, accepted.chat_started
    );

    match market
        .applications
        .transition_status(
            &directory.employer.id,
            &application.id,
            ApplicationStatus::Accepted,
        )
        .await
    {
        Ok(_) => println!("  Repeated acceptance unexpectedly applied"),
        Err(err @ MarketplaceError::Conflict(_)) => println!("  Accepting again rejected: {err}"),
        Err(other) => return Err(other.into()),
    }

    if args.json {
        let applicants = market
            .applications
            .applications_for_posting(&directory.employer.id, &directory.posting.id)
            .await?;
        print_json("  Employer review listing", &applicants);
    }
    Ok(())
}

async fn demo_rival(
    market: &Market,
    directory: &DemoDirectory,
    application: &Application,
) -> Result<(), AppError> {
    println!(
        "\n[4] {} tries to reject an application on another employer's posting",
        directory.rival.name
    );
    match market
        .applications
        .transition_status(
            &directory.rival.id,
            &application.id,
            ApplicationStatus::Rejected,
        )
        .await
    {
        Ok(_) => println!("  Unexpectedly allowed"),
        Err(MarketplaceError::Forbidden) => println!("  Forbidden"),
        Err(other) => return Err(other.into()),
    }
    Ok(())
}

async fn demo_deletion(
    market: &Market,
    store: &InMemoryStore,
    directory: &DemoDirectory,
    args: &DemoArgs,
) -> Result<(), AppError> {
    println!("\n[5] {} deletes their account", directory.employer.name);
    let deletion = market
        .employers
        .delete_account(
            &DemoDirectory::principal(&directory.employer),
            &directory.employer.id,
        )
        .await?;

    match deletion.cascade {
        Some(cascade) => println!(
            "  Removed {} postings, {} chat threads, {} applications ({} late sweeps)",
            cascade.postings, cascade.chat_threads, cascade.applications, cascade.late_sweeps
        ),
        None => println!("  Cascade incomplete; reconciliation will finish it"),
    }

    let employer = directory.employer_profile.id;
    let dangling = store
        .chat_threads()
        .await
        .map_err(MarketplaceError::from)?
        .iter()
        .filter(|thread| thread.employer == employer)
        .count();
    println!("  Chat threads still referencing the employer: {dangling}");

    let listing = market
        .applications
        .applications_for_seeker(&directory.seeker.id)
        .await?;
    println!(
        "  {} now sees {} application(s); profile {} kept",
        directory.seeker.name,
        listing.len(),
        directory.seeker_profile.id
    );

    let report = market.reconciler.reconcile().await?;
    if report.is_clean() {
        println!("  Reconciliation: nothing to repair");
    } else {
        println!("  Reconciliation repaired leftovers");
    }
    if args.json {
        print_json("  Deletion result", &deletion);
        print_json("  Reconciliation report", &report);
    }
    Ok(())
}

fn print_json<T: serde::Serialize>(label: &str, value: &T) {
    match serde_json::to_string_pretty(value) {
        Ok(json) => println!("{label}:\n{json}"),
        Err(err) => println!("{label} unavailable: {err}"),
    }
}
