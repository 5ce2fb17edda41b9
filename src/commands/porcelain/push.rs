use crate::areas::repository::Repository;
use crate::artifacts::branch::branch_name::BranchName;
use crate::artifacts::objects::object_id::ObjectId;
use crate::artifacts::pack::encoder::PackEncoder;
use crate::artifacts::transfer::client::{Credentials, PushClient, ReportStatus};
use anyhow::Context;
use std::io::Write;
use std::time::Duration;

#[derive(Debug, Clone)]
pub struct PushOptions {
    pub force: bool,
    pub username: Option<String>,
    pub password: Option<String>,
    pub timeout: Duration,
    pub retries: u32,
}

impl Default for PushOptions {
    fn default() -> Self {
        PushOptions {
            force: false,
            username: None,
            password: None,
            timeout: Duration::from_secs(30),
            retries: 3,
        }
    }
}

impl Repository {
    /// Push a branch to a configured remote over smart HTTP.
    pub async fn push(
        &mut self,
        remote: &str,
        branch: &str,
        opts: &PushOptions,
    ) -> anyhow::Result<()> {
        let branch_name = BranchName::try_parse(branch.to_string())?;
        let ref_path = branch_name.to_ref_path();

        let local_oid = self
            .refs()
            .read_ref(branch_name.clone())?
            .with_context(|| format!("branch {branch_name} has no commits to push"))?;

        let config = self.config_store();
        let config = config.lock().await;
        let url = config
            .remote_url(remote)
            .with_context(|| format!("remote not configured: {remote}"))?
            .to_string();
        drop(config);

        writeln!(self.writer(), "Pushing {branch_name} to {remote} ({url})")?;

        let credentials = opts.username.clone().map(|username| Credentials {
            username,
            password: opts.password.clone(),
        });
        let client = PushClient::new(&url, credentials, opts.timeout, opts.retries)?;

        let remote_refs = client.discover_refs().await?;
        let remote_oid = remote_refs
            .get(&ref_path)
            .cloned()
            .unwrap_or_else(ObjectId::zero);

        if remote_oid == local_oid {
            writeln!(self.writer(), "Everything up-to-date")?;
            return Ok(());
        }

        // refuse to clobber remote history we do not descend from
        if !opts.force && !remote_oid.is_zero() {
            let known = self.database().reachable_objects(&local_oid, true)?;
            if !known.contains(&remote_oid) {
                anyhow::bail!(
                    "push to {ref_path} is not a fast-forward (remote is at {}); use --force to overwrite",
                    remote_oid.to_short_oid()
                );
            }
        }

        let objects = self
            .database()
            .objects_to_send(&local_oid, std::slice::from_ref(&remote_oid))?;
        if objects.is_empty() {
            writeln!(self.writer(), "Everything up-to-date")?;
            return Ok(());
        }

        tracing::info!(
            branch = %branch_name,
            remote,
            objects = objects.len(),
            "sending pack"
        );
        writeln!(self.writer(), "Objects to push: {}", objects.len())?;

        let pack = PackEncoder::new(self.database()).encode(&objects)?;
        let verdict = client
            .send_pack(&ref_path, &remote_oid, &local_oid, pack)
            .await?;

        match verdict {
            ReportStatus::Accepted => {
                writeln!(
                    self.writer(),
                    "{} -> {remote}/{branch_name}",
                    local_oid.to_short_oid()
                )?;
            }
            ReportStatus::AmbiguousSuccess => {
                writeln!(
                    self.writer(),
                    "Push completed (no explicit confirmation from remote)"
                )?;
            }
        }

        Ok(())
    }
}
