use tracing::{debug, error, info};

use crate::consts::LD_JSON;
use crate::error::{Error, Result};
use crate::listing::{extract_rows, project_refs};
use crate::project::{ProjectRecord, ProjectRef};
use crate::retry::{Outcome, Verdict};
use crate::tally::ErrorKind;
use crate::transport::log_response;

use super::Session;

impl Session {
    /// Projects of the logged in account, in listing order.
    ///
    /// Fetched once; later calls return the same list without a request.
    /// Rows without a title or without a project link are skipped.
    pub fn projects_list(&mut self) -> Result<&[ProjectRef]> {
        if self.projects.is_empty() {
            let response = self
                .client
                .get(&self.endpoints.index, &self.cookies, &mut self.tally)?;
            let rows = extract_rows(&response.body);
            self.projects = project_refs(&rows);
            info!(
                rows = rows.len(),
                projects = self.projects.len(),
                "read project listing"
            );
        }
        Ok(self.projects.as_slice())
    }

    /// Fetch one project's payload.
    ///
    /// Anything not served as JSON-LD is retried with a fresh request. When
    /// the budget runs out the record carries the last body as garbage
    /// instead of failing.
    pub fn project(&mut self, project: &ProjectRef) -> Result<ProjectRecord> {
        let url = format!("{}{}", self.endpoints.project, project.id);
        let label = format!("project {}", project.id);

        let outcome = self.budget.run(
            &label,
            &mut self.tally,
            |tally, _| {
                self.client
                    .get(&url, &self.cookies, tally)
                    .map_err(Error::from)
            },
            |response, attempt| {
                if response.content_type() == Some(LD_JSON) {
                    return Verdict::Accept;
                }
                info!(
                    id = %project.id,
                    label = %project.label,
                    content_type = response.content_type().unwrap_or(""),
                    expected = LD_JSON,
                    attempt,
                    "unexpected content-type"
                );
                log_response(ErrorKind::UnexpectedContentType, response);
                Verdict::Reject(Some(ErrorKind::UnexpectedContentType))
            },
        )?;

        match outcome {
            Outcome::Accepted { value, .. } => {
                debug!(id = %project.id, label = %project.label, "file looks good");
                Ok(ProjectRecord::success(project.clone(), value.body))
            }
            Outcome::Exhausted { last, .. } => {
                self.tally.record(ErrorKind::BadFile);
                error!(id = %project.id, label = %project.label, "skipping file");
                Ok(ProjectRecord::failure(project.clone(), last.body))
            }
        }
    }

    /// Lazily fetch every listed project, one after the other.
    ///
    /// Each call starts a new pass with new requests.
    pub fn projects(&mut self) -> Result<Projects<'_>> {
        let pending = self.projects_list()?.to_vec();
        Ok(Projects {
            session: self,
            pending: pending.into_iter(),
        })
    }

    /// Every listed project, fetched eagerly
    pub fn projects_as_list(&mut self) -> Result<Vec<ProjectRecord>> {
        self.projects()?.collect()
    }
}

/// Iterator returned by [`Session::projects`]
pub struct Projects<'a> {
    session: &'a mut Session,
    pending: std::vec::IntoIter<ProjectRef>,
}

impl Iterator for Projects<'_> {
    type Item = Result<ProjectRecord>;

    fn next(&mut self) -> Option<Self::Item> {
        let project = self.pending.next()?;
        Some(self.session.project(&project))
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        self.pending.size_hint()
    }
}

impl ExactSizeIterator for Projects<'_> {}
