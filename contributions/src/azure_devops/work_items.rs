use super::api::{AzureDevOpsApi, TeamProject, WorkItem};
use super::repository::AzureDevOpsRepository;
use super::{AzureUser, ScanSettings};
use crate::calendar::DateRange;
use crate::errors::Result;
use crate::manager::ProviderAccount;
use crate::model::{ActivityKind, DayCounts};
use crate::strategy::{ContributionStrategy, scan_units};
use async_trait::async_trait;
use std::collections::BTreeSet;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

const WIQL_DATE_FORMAT: &str = "%Y-%m-%d";

/// Work items created or changed by the user, one project at a time.
///
/// A change on the day the item was created is not counted again.
pub struct WorkItemsStrategy {
    repository: Arc<AzureDevOpsRepository>,
    settings: ScanSettings,
}

impl WorkItemsStrategy {
    pub fn new(repository: Arc<AzureDevOpsRepository>, settings: ScanSettings) -> Self {
        WorkItemsStrategy {
            repository,
            settings,
        }
    }
}

#[async_trait]
impl ContributionStrategy<AzureUser> for WorkItemsStrategy {
    fn kind(&self) -> ActivityKind {
        ActivityKind::WorkItems
    }

    async fn get_contributions(
        &self,
        user: &AzureUser,
        account: &ProviderAccount,
        range: &DateRange,
        cancel: &CancellationToken,
    ) -> Result<DayCounts> {
        let projects = self
            .repository
            .projects(&user.organization, &account.token)
            .await?;
        let wiql = Arc::new(build_wiql(&user.identity.account, range));
        let range = *range;

        scan_units(
            self.kind(),
            projects,
            self.settings.max_concurrency,
            cancel,
            |project| {
                let api = self.repository.api();
                let user = user.clone();
                let token = account.token.clone();
                let wiql = wiql.clone();
                let batch_size = self.settings.work_item_batch_size;
                async move {
                    count_work_items(
                        api.as_ref(),
                        &user,
                        &project,
                        &wiql,
                        batch_size,
                        range,
                        &token,
                    )
                    .await
                }
            },
        )
        .await
    }
}

fn build_wiql(account: &str, range: &DateRange) -> String {
    let account = account.replace('\'', "''");
    let from = range.from.format(WIQL_DATE_FORMAT);
    let to = range.to.format(WIQL_DATE_FORMAT);

    format!(
        "SELECT [System.Id] FROM WorkItems WHERE \
         ([System.TeamProject] = @project) AND (\
         ([System.CreatedBy] = '{account}' \
         AND [System.CreatedDate] >= '{from}' AND [System.CreatedDate] <= '{to}') \
         OR \
         ([System.ChangedBy] = '{account}' \
         AND [System.ChangedDate] >= '{from}' AND [System.ChangedDate] <= '{to}')\
         ) ORDER BY [System.ChangedDate] DESC"
    )
}

async fn count_work_items(
    api: &dyn AzureDevOpsApi,
    user: &AzureUser,
    project: &TeamProject,
    wiql: &str,
    batch_size: usize,
    range: DateRange,
    token: &str,
) -> Result<DayCounts> {
    let ids: BTreeSet<u64> = api
        .query_work_items(&user.organization, project, wiql, token)
        .await?
        .into_iter()
        .collect();
    let ids: Vec<u64> = ids.into_iter().collect();

    let mut counts = DayCounts::new();
    for batch in ids.chunks(batch_size.max(1)) {
        let items = api.work_items(&user.organization, batch, token).await?;
        for item in &items {
            record(item, &user.identity.id, range, &mut counts);
        }
    }

    Ok(counts)
}

fn is_user(field: Option<&str>, user_id: &str) -> bool {
    field.is_some_and(|id| id.eq_ignore_ascii_case(user_id))
}

fn record(item: &WorkItem, user_id: &str, range: DateRange, counts: &mut DayCounts) {
    let created = item.created_date;

    if is_user(item.created_by.as_deref(), user_id) {
        if let Some(at) = created.filter(|at| range.contains(*at)) {
            counts.increment(at.date_naive());
        }
    }

    let Some(changed) = item.changed_date.filter(|at| range.contains(*at)) else {
        return;
    };
    let same_day_as_creation = created.is_some_and(|c| c.date_naive() == changed.date_naive());
    if is_user(item.changed_by.as_deref(), user_id) && !same_day_as_creation {
        counts.increment(changed.date_naive());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::azure_devops::api::Page;
    use crate::testutils::{FakeAzureDevOps, azure_account, azure_repository, azure_user, utc};

    const ME: &str = "user-1";

    fn item(id: u64, created: (&str, &str), changed: (&str, &str)) -> WorkItem {
        WorkItem {
            id,
            created_date: Some(utc(created.0)),
            created_by: Some(created.1.to_string()),
            changed_date: Some(utc(changed.0)),
            changed_by: Some(changed.1.to_string()),
        }
    }

    #[test]
    fn test_record() {
        let range = DateRange::year(2024).unwrap();
        let mut counts = DayCounts::new();

        // created and changed by me on different days
        record(
            &item(1, ("2024-02-01T10:00:00Z", ME), ("2024-02-03T10:00:00Z", "USER-1")),
            ME,
            range,
            &mut counts,
        );
        // created by someone else, changed by me the same day
        record(
            &item(2, ("2024-02-05T08:00:00Z", "other"), ("2024-02-05T18:00:00Z", ME)),
            ME,
            range,
            &mut counts,
        );
        // created by me last year, changed by me this year
        record(
            &item(3, ("2023-11-01T10:00:00Z", ME), ("2024-01-10T10:00:00Z", ME)),
            ME,
            range,
            &mut counts,
        );
        // identity fields missing
        record(&WorkItem { id: 4, ..Default::default() }, ME, range, &mut counts);

        assert_eq!(counts.get("2024-02-01".parse().unwrap()), 1);
        assert_eq!(counts.get("2024-02-03".parse().unwrap()), 1);
        assert_eq!(counts.get("2024-02-05".parse().unwrap()), 0);
        assert_eq!(counts.get("2024-01-10".parse().unwrap()), 1);
        assert_eq!(counts.total(), 3);
    }

    #[test]
    fn test_wiql_escapes_account() {
        let wiql = build_wiql("o'brien@example.com", &DateRange::year(2024).unwrap());
        assert!(wiql.contains("[System.CreatedBy] = 'o''brien@example.com'"));
        assert!(wiql.contains("[System.ChangedDate] >= '2024-01-01'"));
        assert!(wiql.contains("[System.ChangedDate] <= '2024-12-31'"));
    }

    #[tokio::test]
    async fn test_ids_are_deduplicated_and_batched() {
        let mut fake = FakeAzureDevOps::single_repo();
        fake.work_items = (1..=5)
            .map(|id| item(id, ("2024-03-01T10:00:00Z", ME), ("2024-03-01T11:00:00Z", ME)))
            .collect();
        fake.duplicate_work_item_ids = true;
        let fake = Arc::new(fake);

        let strategy = WorkItemsStrategy::new(
            azure_repository(fake.clone()),
            ScanSettings {
                max_concurrency: 2,
                first_page: Page { top: 100, skip: 0 },
                max_pages: 100,
                work_item_batch_size: 2,
            },
        );
        let counts = strategy
            .get_contributions(
                &azure_user(),
                &azure_account(),
                &DateRange::year(2024).unwrap(),
                &CancellationToken::new(),
            )
            .await
            .unwrap();

        assert_eq!(counts.get("2024-03-01".parse().unwrap()), 5);
        assert_eq!(fake.calls("work_items"), 3);
    }
}
