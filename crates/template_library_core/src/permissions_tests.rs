use super::*;
use crate::test_support::{actor, version_with, ADMIN, AUTHOR, OTHER};
use template_store::{ApprovalStatus, Collaborator, CollaboratorRole};

// ============================================================================
// can_delete truth table
// ============================================================================

#[test]
fn test_admins_may_always_delete() {
    for is_creator in [false, true] {
        for is_published in [false, true] {
            for visibility in [Visibility::Private, Visibility::Internal, Visibility::Global] {
                assert!(can_delete(DeleteCheck {
                    is_admin: true,
                    is_creator,
                    is_published,
                    visibility,
                }));
            }
        }
    }
}

#[test]
fn test_non_admin_non_creators_may_never_delete() {
    for is_published in [false, true] {
        for visibility in [Visibility::Private, Visibility::Internal, Visibility::Global] {
            assert!(!can_delete(DeleteCheck {
                is_admin: false,
                is_creator: false,
                is_published,
                visibility,
            }));
        }
    }
}

#[test]
fn test_creator_delete_table() {
    let cases = [
        (false, Visibility::Private, true),
        (false, Visibility::Internal, true),
        (false, Visibility::Global, true),
        (true, Visibility::Private, true),
        (true, Visibility::Internal, false),
        (true, Visibility::Global, false),
    ];

    for (is_published, visibility, expected) in cases {
        assert_eq!(
            can_delete(DeleteCheck {
                is_admin: false,
                is_creator: true,
                is_published,
                visibility,
            }),
            expected,
            "published={is_published} visibility={visibility}"
        );
    }
}

// ============================================================================
// can_update
// ============================================================================

#[test]
fn test_versions_under_review_are_editable_by_creator_or_admin() {
    for status in [ApprovalStatus::Pending, ApprovalStatus::Rejected] {
        let last = version_with(status, Visibility::Global);

        assert!(can_update(&last, &actor(AUTHOR, false), false));
        assert!(can_update(&last, &actor(ADMIN, false), true));
        assert!(!can_update(&last, &actor(OTHER, true), false));
    }
}

#[test]
fn test_final_shared_versions_need_internal_staff() {
    for status in [ApprovalStatus::Approved, ApprovalStatus::Canceled] {
        for visibility in [Visibility::Internal, Visibility::Global] {
            let last = version_with(status, visibility);

            assert!(can_update(&last, &actor(OTHER, true), false));
            assert!(!can_update(&last, &actor(AUTHOR, false), false));
            assert!(!can_update(&last, &actor(ADMIN, false), true));
        }
    }
}

#[test]
fn test_final_private_versions_need_an_editing_collaborator() {
    let mut last = version_with(ApprovalStatus::Approved, Visibility::Private);
    last.collaborators.push(Collaborator {
        email: "editor@example.com".to_string(),
        role: CollaboratorRole::Editor,
    });
    last.collaborators.push(Collaborator {
        email: "viewer@example.com".to_string(),
        role: CollaboratorRole::Viewer,
    });

    assert!(can_update(&last, &actor(AUTHOR, false), false));
    assert!(can_update(&last, &actor("editor@example.com", false), false));
    assert!(!can_update(&last, &actor("viewer@example.com", false), false));
    assert!(!can_update(&last, &actor(OTHER, true), true));
}
