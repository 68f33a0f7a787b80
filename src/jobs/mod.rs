//! Newsletter scheduling

pub mod newsletter;

use std::sync::Arc;

use tokio_cron_scheduler::{Job, JobScheduler};
use tracing::info;

pub use newsletter::{NewsletterJob, write_dry_run};

/// Register the newsletter job under `cron` and start the scheduler
pub async fn start_scheduler(job: Arc<NewsletterJob>, cron: &str) -> anyhow::Result<JobScheduler> {
    let scheduler = JobScheduler::new().await?;

    let newsletter_job = Job::new_async(cron, move |_uuid, _l| {
        let job = job.clone();
        Box::pin(async move {
            info!("Running scheduled newsletter");
            if let Err(e) = job.run().await {
                tracing::error!(error = %e, "Newsletter run failed");
            }
        })
    })?;
    scheduler.add(newsletter_job).await?;

    scheduler.start().await?;
    info!(cron = %cron, "Newsletter scheduler started");

    Ok(scheduler)
}
