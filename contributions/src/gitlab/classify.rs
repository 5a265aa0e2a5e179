// Which events count as contributions, following GitLab's own `contributions` scope
// on the Event model.
use super::api::GitLabEvent;
use crate::model::ActivityKind;

const MERGE_REQUEST_ACTIONS: &[&str] = &[
    "accepted",
    "opened",
    "closed",
    "merged",
    "approved",
    "updated",
    "destroyed",
];
const ISSUE_ACTIONS: &[&str] = &["opened", "closed", "reopened", "updated"];
const WORK_ITEM_ACTIONS: &[&str] = &["opened", "closed", "reopened", "updated", "destroyed"];
const OTHER_TARGETS: &[&str] = &["wikipage", "milestone", "project", "design"];

/// The kind and weight of an event, or `None` when it is not a contribution.
///
/// A push weighs as many commits as it carried; everything else weighs one.
pub fn classify(event: &GitLabEvent) -> Option<(ActivityKind, u64)> {
    let action = lower(event.action_name.as_deref());
    let target = lower(event.target_type.as_deref());

    if action.contains("pushed") {
        if let Some(push) = &event.push_data {
            return Some((ActivityKind::Commits, push.commit_count));
        }
    }

    if target.contains("mergerequest") && MERGE_REQUEST_ACTIONS.contains(&action.as_str()) {
        return Some((ActivityKind::PullRequests, 1));
    }
    if target.contains("issue") && ISSUE_ACTIONS.contains(&action.as_str()) {
        return Some((ActivityKind::Issues, 1));
    }
    if target.contains("workitem") && WORK_ITEM_ACTIONS.contains(&action.as_str()) {
        return Some((ActivityKind::WorkItems, 1));
    }

    let noteable = lower(event.note.as_ref().and_then(|n| n.noteable_type.as_deref()));
    if target.contains("note")
        && noteable.contains("mergerequest")
        && action.contains("commented")
    {
        return Some((ActivityKind::Reviews, 1));
    }

    if action.contains("commented") || OTHER_TARGETS.iter().any(|t| target.contains(t)) {
        return Some((ActivityKind::All, 1));
    }

    None
}

fn lower(value: Option<&str>) -> String {
    value.unwrap_or_default().to_lowercase()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gitlab::api::{Note, PushData};

    fn event(action: &str, target: Option<&str>) -> GitLabEvent {
        GitLabEvent {
            action_name: Some(action.into()),
            target_type: target.map(Into::into),
            ..Default::default()
        }
    }

    #[test]
    fn test_push() {
        let mut push = event("pushed to", None);
        push.push_data = Some(PushData { commit_count: 4 });
        assert_eq!(classify(&push), Some((ActivityKind::Commits, 4)));

        // a push without push data carries nothing
        assert_eq!(classify(&event("pushed new", None)), None);
    }

    #[test]
    fn test_targets() {
        assert_eq!(
            classify(&event("merged", Some("MergeRequest"))),
            Some((ActivityKind::PullRequests, 1))
        );
        assert_eq!(
            classify(&event("opened", Some("Issue"))),
            Some((ActivityKind::Issues, 1))
        );
        assert_eq!(
            classify(&event("destroyed", Some("WorkItem"))),
            Some((ActivityKind::WorkItems, 1))
        );
        assert_eq!(classify(&event("destroyed", Some("Issue"))), None);
        assert_eq!(classify(&event("joined", None)), None);
        assert_eq!(
            classify(&event("created", Some("WikiPage::Meta"))),
            Some((ActivityKind::All, 1))
        );
        assert_eq!(
            classify(&event("updated", Some("Milestone"))),
            Some((ActivityKind::All, 1))
        );
    }

    #[test]
    fn test_comments() {
        let mut review = event("commented on", Some("Note"));
        review.note = Some(Note {
            noteable_type: Some("MergeRequest".into()),
        });
        assert_eq!(classify(&review), Some((ActivityKind::Reviews, 1)));

        let mut issue_comment = event("commented on", Some("DiscussionNote"));
        issue_comment.note = Some(Note {
            noteable_type: Some("Issue".into()),
        });
        assert_eq!(classify(&issue_comment), Some((ActivityKind::All, 1)));
    }
}
