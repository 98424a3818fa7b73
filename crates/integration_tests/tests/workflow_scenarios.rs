//! End-to-end scenarios of the approval workflow.
//!
//! Each test drives the public library operations and then inspects the stored documents.

use integration_tests::fixtures::{ADMIN, AUTHOR, OTHER, STAFF};
use integration_tests::{actor, init_test_logging, template_request, TestLibrary};
use template_library_core::{
    ApprovalStatus, CollaboratorRole, NotificationKind, Operation, Recipient, UpdateBranch,
    Visibility, WorkflowError,
};
use template_store::{StoreTransaction, TemplateId, TemplateStore, VersionId};
use tracing::info;

async fn set_last_status(lib: &TestLibrary, id: &TemplateId, status: ApprovalStatus) {
    let mut tx = lib.store.begin().await.expect("begin");
    let template = tx.get_template(id).await.expect("template");
    let mut last = tx.get_version(&template.last_version).await.expect("version");
    last.approval.status = status;
    tx.update_version(&last).expect("stage");
    tx.commit().await.expect("commit");
}

#[tokio::test]
async fn test_internal_create_by_customer_waits_for_review() {
    init_test_logging();
    let lib = TestLibrary::new();

    let created = lib.create(AUTHOR, "internal").await;
    let id = created.template.id().clone();

    assert_eq!(created.last_version.approval.status, ApprovalStatus::Pending);
    assert!(!created.last_version.active);
    assert!(created.template.active_version.is_none());
    assert!(created.template.active_report.is_none());
    assert_eq!(created.last_version.id(), VersionId::first());
    assert!(created.last_version.collaborators.is_empty());

    let sent = lib.sender.sent();
    assert_eq!(sent.len(), 1);
    assert_eq!(sent[0].kind, NotificationKind::VersionSubmitted);
    assert_eq!(sent[0].recipients, vec![Recipient::Reviewers]);
    assert!(sent[0].template_url.contains(id.as_str()));

    lib.assert_consistent(&id).await;
}

#[tokio::test]
async fn test_private_create_by_customer_is_published_with_owner() {
    init_test_logging();
    let lib = TestLibrary::new();

    let created = lib.create(AUTHOR, "private").await;

    let version = &created.last_version;
    assert_eq!(version.approval.status, ApprovalStatus::Approved);
    assert_eq!(version.approval.approved_by.as_deref(), Some(AUTHOR));
    assert!(version.active);
    assert_eq!(version.collaborators.len(), 1);
    assert_eq!(version.collaborators[0].email, AUTHOR);
    assert_eq!(version.collaborators[0].role, CollaboratorRole::Owner);
    assert_eq!(
        created.template.active_version.as_ref(),
        Some(&version.reference)
    );
    assert!(lib.sender.sent().is_empty());

    lib.assert_consistent(created.template.id()).await;
}

#[tokio::test]
async fn test_auto_approve_truth_table_on_create() {
    init_test_logging();
    let lib = TestLibrary::new();

    let cases = [
        (AUTHOR, "private", true),
        (AUTHOR, "internal", false),
        (AUTHOR, "global", false),
        (ADMIN, "private", true),
        (ADMIN, "internal", true),
        (ADMIN, "global", true),
    ];

    for (email, visibility, approved) in cases {
        let created = lib.create(email, visibility).await;
        let expected = if approved {
            ApprovalStatus::Approved
        } else {
            ApprovalStatus::Pending
        };
        assert_eq!(
            created.last_version.approval.status, expected,
            "{email} creating {visibility}"
        );
        assert_eq!(created.last_version.active, approved, "{email} {visibility}");
        lib.assert_consistent(created.template.id()).await;
    }
}

#[tokio::test]
async fn test_approve_is_idempotent() {
    init_test_logging();
    let lib = TestLibrary::new();
    let created = lib.create(AUTHOR, "global").await;
    let id = created.template.id().clone();
    let admin = actor(ADMIN, false);

    lib.library
        .approve_template(&admin, id.as_str())
        .await
        .expect("first approve");
    let template_before = lib.template(&id).await;
    let versions_before = lib.versions(&id);
    let sent_before = lib.sender.sent().len();

    let err = lib
        .library
        .approve_template(&admin, id.as_str())
        .await
        .expect_err("second approve");

    assert!(matches!(err, WorkflowError::VersionIsApproved));
    assert!(err.is_already_applied(Operation::Approve));
    assert_eq!(lib.template(&id).await, template_before);
    assert_eq!(lib.versions(&id), versions_before);
    assert_eq!(lib.sender.sent().len(), sent_before);
}

#[tokio::test]
async fn test_approve_on_canceled_version_changes_nothing() {
    init_test_logging();
    let lib = TestLibrary::new();
    let created = lib.create(AUTHOR, "internal").await;
    let id = created.template.id().clone();
    set_last_status(&lib, &id, ApprovalStatus::Canceled).await;
    let before = lib.versions(&id);

    let result = lib
        .library
        .approve_template(&actor(ADMIN, false), id.as_str())
        .await;

    let err = result.expect_err("canceled version");
    assert!(matches!(err, WorkflowError::VersionIsCanceled));
    assert!(!err.is_already_applied(Operation::Approve));
    assert_eq!(lib.versions(&id), before);
}

#[tokio::test]
async fn test_demotion_from_global_is_refused_for_every_actor() {
    init_test_logging();
    let lib = TestLibrary::new();
    let created = lib.create(ADMIN, "global").await;
    let id = created.template.id().clone();

    for (email, staff) in [(ADMIN, true), (ADMIN, false), (STAFF, true), (AUTHOR, false)] {
        let result = lib
            .library
            .update_template(
                &actor(email, staff),
                id.as_str(),
                template_request("Spend", "private"),
            )
            .await;

        assert!(
            matches!(
                result,
                Err(WorkflowError::VisibilityCanNotBeDemoted {
                    from: Visibility::Global,
                    to: Visibility::Private,
                })
            ),
            "{email} (internal staff: {staff})"
        );
    }
    assert_eq!(lib.versions(&id).len(), 1);
}

#[tokio::test]
async fn test_stranger_cannot_delete_published_global_template() {
    init_test_logging();
    let lib = TestLibrary::new();
    let created = lib.create(ADMIN, "global").await;
    let id = created.template.id().clone();

    let result = lib
        .library
        .delete_template(&actor(OTHER, false), id.as_str())
        .await;

    assert!(matches!(
        result,
        Err(WorkflowError::Unauthorized {
            operation: Operation::Delete
        })
    ));
    assert!(!lib.template(&id).await.hidden);
}

#[tokio::test]
async fn test_update_branch_follows_status_of_last_version() {
    init_test_logging();
    let lib = TestLibrary::new();

    let cases = [
        (ApprovalStatus::Pending, UpdateBranch::InPlace),
        (ApprovalStatus::Rejected, UpdateBranch::InPlace),
        (ApprovalStatus::Approved, UpdateBranch::Fork),
        (ApprovalStatus::Canceled, UpdateBranch::Fork),
    ];

    for (status, branch) in cases {
        assert_eq!(UpdateBranch::for_status(status), branch);

        let created = lib.create(ADMIN, "internal").await;
        let id = created.template.id().clone();
        set_last_status(&lib, &id, status).await;

        let updated = lib
            .library
            .update_template(
                &actor(ADMIN, true),
                id.as_str(),
                template_request("Spend v2", "internal"),
            )
            .await
            .expect("update");

        let expected_id = match branch {
            UpdateBranch::InPlace => VersionId::first(),
            UpdateBranch::Fork => VersionId::from(1),
        };
        info!(status = ?status, version = %updated.last_version.id(), "Updated");
        assert_eq!(updated.last_version.id(), expected_id, "{status:?}");
        assert_eq!(lib.versions(&id).len() as u64, expected_id.value() + 1);
    }
}

#[tokio::test]
async fn test_full_review_cycle() {
    init_test_logging();
    let lib = TestLibrary::new();
    let admin = actor(ADMIN, false);
    let author = actor(AUTHOR, false);

    // Submitted, rejected, fixed and approved.
    let created = lib.create(AUTHOR, "internal").await;
    let id = created.template.id().clone();
    lib.library
        .reject_template(&admin, id.as_str(), "Add a description of the grouping")
        .await
        .expect("reject");
    let resubmitted = lib
        .library
        .update_template(&author, id.as_str(), template_request("Spend", "global"))
        .await
        .expect("resubmit");
    assert_eq!(resubmitted.last_version.id(), VersionId::first());
    assert_eq!(resubmitted.last_version.approval.status, ApprovalStatus::Pending);
    assert_eq!(resubmitted.last_version.approval.changes.len(), 1);

    let approved = lib
        .library
        .approve_template(&admin, id.as_str())
        .await
        .expect("approve");
    assert!(approved.last_version.active);
    assert_eq!(approved.last_version.visibility, Visibility::Global);

    // Internal staff fork the published version; the published one stays live until review.
    let forked = lib
        .library
        .update_template(
            &actor(STAFF, true),
            id.as_str(),
            template_request("Spend by service", "global"),
        )
        .await
        .expect("fork");
    assert_eq!(forked.last_version.id(), VersionId::from(1));
    assert_eq!(
        forked.template.active_version.as_ref(),
        Some(&approved.last_version.reference)
    );

    let customer_view = lib.library.get_template_data(false).await.expect("data");
    assert_eq!(customer_view.versions[0].id(), VersionId::first());
    let staff_view = lib.library.get_template_data(true).await.expect("data");
    assert_eq!(staff_view.versions[0].id(), VersionId::from(1));

    lib.library
        .approve_template(&admin, id.as_str())
        .await
        .expect("approve fork");
    let report = lib
        .library
        .get_template_report(id.as_str(), false)
        .await
        .expect("report");
    assert_eq!(report.name, "Spend by service");

    let kinds: Vec<NotificationKind> = lib.sender.sent().iter().map(|n| n.kind).collect();
    assert_eq!(
        kinds,
        vec![
            NotificationKind::VersionSubmitted,
            NotificationKind::VersionRejected,
            NotificationKind::VersionApproved,
            NotificationKind::VersionUpdated,
            NotificationKind::VersionApproved,
        ]
    );

    lib.assert_consistent(&id).await;
}

#[tokio::test]
async fn test_hidden_template_leaves_every_view() {
    init_test_logging();
    let lib = TestLibrary::new();
    let created = lib.create(AUTHOR, "private").await;
    let id = created.template.id().clone();

    lib.library
        .delete_template(&actor(AUTHOR, false), id.as_str())
        .await
        .expect("delete");
    lib.library
        .delete_template(&actor(AUTHOR, false), id.as_str())
        .await
        .expect("repeated delete is a no-op");
    assert!(matches!(
        lib.library
            .delete_template(&actor(OTHER, false), id.as_str())
            .await,
        Err(WorkflowError::Unauthorized {
            operation: Operation::Delete
        })
    ));

    assert!(lib
        .library
        .get_template_data(true)
        .await
        .expect("data")
        .templates
        .is_empty());
    assert!(matches!(
        lib.library
            .update_template(&actor(AUTHOR, false), id.as_str(), template_request("x", "private"))
            .await,
        Err(WorkflowError::TemplateIsHidden)
    ));
    assert!(matches!(
        lib.library.get_template_report(id.as_str(), true).await,
        Err(WorkflowError::NotFound { .. })
    ));
}
