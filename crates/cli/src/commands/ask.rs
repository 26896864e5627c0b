//! `threadline ask`: one message, one reply.

use anyhow::Context;
use std::path::{Path, PathBuf};
use threadline_agent::{Attachment, TurnRequest};

use super::output;
use super::runtime::{AbortOnInterrupt, Runtime};

pub async fn run(secrets: Option<&Path>, message: String, file: Option<PathBuf>) -> anyhow::Result<()> {
    let runtime = Runtime::build(secrets).await?;

    let mut request = TurnRequest::text(message);
    if let Some(path) = file {
        let attachment = Attachment::from_path(&path)
            .await
            .with_context(|| format!("Cannot attach {}", path.display()))?;
        request = request.with_attachment(attachment);
    }

    let mut session = runtime.session().await?;
    let progress = runtime.spawn_progress();

    let mut abort = AbortOnInterrupt::arm();
    let result = runtime
        .engine
        .send(&mut session, request, abort.receiver())
        .await;
    progress.finish().await;

    let reply = result.context("The assistant could not answer")?;
    output::print_turn(&reply);
    let saved = output::save_outputs(&reply, &runtime.config.download_dir)
        .await
        .context("Failed to save returned files")?;
    output::print_saved(&saved);

    Ok(())
}
