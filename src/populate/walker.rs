//! Schema walk resolving the entity type a path lands on.
//!
//! The walk starts at the root type and consumes one segment at a time,
//! switching the active schema whenever it crosses a reference.

use std::sync::Arc;
use crate::types::{EntityType, FieldKind, SchemaGraph, SchemaRegistry};

/// Resolve the type a fetch for `path` must load, or `None` for paths that
/// only cross embedded structure (or are unknown to the schemas).
///
/// Segments that are not found extend a structural prefix, so fields of a
/// nested object flattened into its parent (`"approved.user"`) still resolve.
/// An unknown segment clears any target recorded so far, but the walk keeps
/// going: a later segment may still resolve against the accumulated prefix.
pub fn resolve_target(registry: &SchemaRegistry, root: &EntityType, path: &str) -> Option<EntityType> {
    let mut schema: Option<Arc<dyn SchemaGraph>> = registry.get(root.as_str());
    let mut prefix = String::new();
    let mut target = None;

    for segment in path.split('.') {
        if !prefix.is_empty() {
            prefix.push('.');
        }
        prefix.push_str(segment);

        let field = schema.as_ref().and_then(|s| s.lookup_field(&prefix).cloned());
        let Some(field) = field else {
            target = None;
            continue;
        };
        prefix.clear();

        match field.kind {
            FieldKind::Reference(referenced) => {
                schema = registry.get(referenced.as_str());
                target = Some(referenced);
            }
            FieldKind::Nested(nested) => {
                schema = Some(nested);
                target = None;
            }
            FieldKind::Scalar => {
                schema = None;
                target = None;
            }
        }
    }

    target
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::types::{FieldMeta, TypeSchema};

    /// Post/User/Comment schemas with every kind of field.
    pub(crate) fn blog_registry() -> SchemaRegistry {
        let like = TypeSchema::new().field("user", FieldMeta::reference("User"));
        SchemaRegistry::new()
            .with("User", TypeSchema::new()
                .field("loaded", FieldMeta::scalar())
                .field("manager", FieldMeta::reference("User"))
                .field("mainPage", FieldMeta::reference("Post")))
            .with("Comment", TypeSchema::new()
                .field("loaded", FieldMeta::scalar())
                .field("user", FieldMeta::reference("User")))
            .with("Post", TypeSchema::new()
                .field("loaded", FieldMeta::scalar())
                .field("user", FieldMeta::reference("User"))
                .field("reviewers", FieldMeta::reference("User").many())
                .field("comments", FieldMeta::reference("Comment").many())
                .field("likes", FieldMeta::nested(like).many())
                .field("approved.status", FieldMeta::scalar())
                .field("approved.user", FieldMeta::reference("User")))
    }

    fn target(path: &str) -> Option<String> {
        resolve_target(&blog_registry(), &EntityType::from("Post"), path)
            .map(|t| t.as_str().to_string())
    }

    #[test]
    fn references_switch_the_active_type() {
        assert_eq!(target("user").as_deref(), Some("User"));
        assert_eq!(target("user.manager").as_deref(), Some("User"));
        assert_eq!(target("comments").as_deref(), Some("Comment"));
        assert_eq!(target("comments.user.manager").as_deref(), Some("User"));
        assert_eq!(target("reviewers.mainPage").as_deref(), Some("Post"));
        assert_eq!(target("reviewers.mainPage.comments").as_deref(), Some("Comment"));
    }

    #[test]
    fn flattened_nested_fields_resolve_through_the_prefix() {
        assert_eq!(target("approved"), None);
        assert_eq!(target("approved.user").as_deref(), Some("User"));
        assert_eq!(target("approved.user.manager").as_deref(), Some("User"));
    }

    #[test]
    fn nested_arrays_are_structural() {
        assert_eq!(target("likes"), None);
        assert_eq!(target("likes.user").as_deref(), Some("User"));
        assert_eq!(target("likes.user.manager").as_deref(), Some("User"));
    }

    #[test]
    fn unknown_and_scalar_paths_have_no_target() {
        assert_eq!(target("invalid1"), None);
        assert_eq!(target("invalid2.invalid3"), None);
        assert_eq!(target("loaded"), None);
        assert_eq!(target("loaded.anything"), None);
        assert_eq!(target("user.unknown"), None);
    }

    #[test]
    fn unregistered_root_has_no_targets() {
        let registry = blog_registry();
        assert_eq!(resolve_target(&registry, &EntityType::from("Ghost"), "user"), None);
    }

    #[test]
    fn reference_to_unregistered_type_still_targets_it() {
        let registry = SchemaRegistry::new()
            .with("Post", TypeSchema::new().field("tag", FieldMeta::reference("Tag")));
        let root = EntityType::from("Post");
        assert_eq!(resolve_target(&registry, &root, "tag"), Some(EntityType::from("Tag")));
        assert_eq!(resolve_target(&registry, &root, "tag.name"), None);
    }
}
