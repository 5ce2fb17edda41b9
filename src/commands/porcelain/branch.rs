use crate::areas::repository::Repository;
use crate::artifacts::branch::branch_name::BranchName;
use colored::Colorize;
use std::io::Write;

impl Repository {
    /// With no name, list branches. With a name, create it at the current
    /// HEAD, or delete it when `delete` is set.
    pub fn branch(&mut self, branch_name: Option<&str>, delete: bool) -> anyhow::Result<()> {
        let Some(branch_name) = branch_name else {
            return self.list_branches();
        };
        let branch_name = BranchName::try_parse(branch_name.to_string())?;

        if delete {
            let oid = self.refs().delete_branch(&branch_name)?;
            writeln!(
                self.writer(),
                "Deleted branch {} (was {})",
                branch_name,
                oid.to_short_oid()
            )?;
            return Ok(());
        }

        let source_oid = self
            .refs()
            .read_head()?
            .ok_or_else(|| anyhow::anyhow!("no current HEAD to branch from"))?;

        self.refs().create_branch(branch_name, source_oid)?;

        Ok(())
    }

    fn list_branches(&self) -> anyhow::Result<()> {
        let current_ref = self.refs().current_ref(None)?;
        let mut branches = self.refs().list_branches()?;
        branches.sort();

        for sym_ref in branches {
            let name = BranchName::try_parse_sym_ref_name(&sym_ref)?;
            if sym_ref == current_ref {
                writeln!(self.writer(), "* {}", name.to_string().green())?;
            } else {
                writeln!(self.writer(), "  {}", name)?;
            }
        }

        Ok(())
    }
}
