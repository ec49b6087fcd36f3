//! Arch-variant shape synthesis.
//!
//! Only fields tagged `arch_variant` can appear inside an `arch`, `multilib`
//! or `target` block. Their shape is derived once per distinct owner shape
//! and split into shards that each stay under a fixed descriptor-name
//! budget.

use std::sync::{Arc, LazyLock};

use tracing::debug;

use super::ShapeError;
use crate::props::{
  PropertyField, PropertyKind, PropertyShape, TAG_ARCH_VARIANT, TAG_PATH, TAG_REPLACE_INSTEAD_OF_APPEND,
  TAG_VARIANT_PREPEND,
};
use crate::util::hash::ShapeId;
use crate::util::once::OncePer;

/// Largest descriptor-name cost a single shard may carry
pub const MAX_SHARD_NAME_COST: usize = 500;

/// Tags removed from fields carried into a shard
const STRIPPED_TAGS: [&str; 3] = [TAG_ARCH_VARIANT, TAG_VARIANT_PREPEND, TAG_PATH];

/// One independent slice of the arch-variant fields of an owner shape.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArchPropShard {
  pub index: usize,
  pub shape: PropertyShape,
}

type ShardList = Arc<[ArchPropShard]>;

static SHARD_CACHE: LazyLock<OncePer<ShapeId, Result<ShardList, ShapeError>>> = LazyLock::new(OncePer::new);

/// Return the arch-variant shards of `shape`, synthesizing them on first use.
///
/// An owner shape without arch-variant fields has no shards.
pub fn arch_prop_shards(shape: &PropertyShape) -> Result<ShardList, ShapeError> {
  let id = shape.id().map_err(|e| ShapeError::Identity(e.to_string()))?;
  SHARD_CACHE.once(id.clone(), || {
    let shards = create_arch_prop_shards(shape, MAX_SHARD_NAME_COST)?;
    debug!(shape = %id, shards = shards.len(), "synthesized arch property shape");
    Ok(shards.into())
  })
}

/// Number of owner shapes synthesized so far in this process
pub fn cached_shape_count() -> usize {
  SHARD_CACHE.len()
}

/// Filter `shape` down to its arch-variant fields and split the result into
/// shards of at most `budget` name cost. A single field larger than the
/// budget gets a shard of its own.
pub fn create_arch_prop_shards(shape: &PropertyShape, budget: usize) -> Result<Vec<ArchPropShard>, ShapeError> {
  let filtered = filter_arch_shape(shape, "")?;

  let mut shards: Vec<Vec<PropertyField>> = Vec::new();
  let mut current: Vec<PropertyField> = Vec::new();
  let mut cost = 0;
  for field in filtered.fields {
    let field_cost = field.name.len() + field.kind.name_cost();
    if !current.is_empty() && cost + field_cost > budget {
      shards.push(std::mem::take(&mut current));
      cost = 0;
    }
    cost += field_cost;
    current.push(field);
  }
  if !current.is_empty() {
    shards.push(current);
  }

  Ok(
    shards
      .into_iter()
      .enumerate()
      .map(|(index, fields)| ArchPropShard {
        index,
        shape: PropertyShape::new(fields),
      })
      .collect(),
  )
}

/// Keep only arch-variant fields, with their marker tags removed.
///
/// Untagged struct fields are searched for tagged descendants and kept when
/// any are found. Tagged struct fields are kept whole.
pub fn filter_arch_shape(shape: &PropertyShape, prefix: &str) -> Result<PropertyShape, ShapeError> {
  let mut fields = Vec::new();
  for field in &shape.fields {
    let path = format!("{}{}", prefix, field.name);
    if field.has_tag(TAG_ARCH_VARIANT) {
      let unknown: Vec<String> = field
        .tags
        .iter()
        .filter(|t| !STRIPPED_TAGS.contains(&t.as_str()) && t.as_str() != TAG_REPLACE_INSTEAD_OF_APPEND)
        .cloned()
        .collect();
      if !unknown.is_empty() {
        return Err(ShapeError::UnknownTags { field: path, tags: unknown });
      }
      let mut kept = field.clone();
      kept.tags.retain(|t| !STRIPPED_TAGS.contains(&t.as_str()));
      fields.push(kept);
    } else if let PropertyKind::Struct(nested) = &field.kind {
      let nested = filter_arch_shape(nested, &format!("{}.", path))?;
      if !nested.is_empty() {
        fields.push(PropertyField::new(field.name.clone(), PropertyKind::Struct(nested)));
      }
    }
  }
  Ok(PropertyShape::new(fields))
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::configurable::ValueType;

  fn owner() -> PropertyShape {
    PropertyShape::new(vec![
      PropertyField::new("srcs", PropertyKind::StringList)
        .tagged(TAG_ARCH_VARIANT)
        .tagged(TAG_PATH),
      PropertyField::new("name", PropertyKind::String),
      PropertyField::new("include_dirs", PropertyKind::StringList)
        .tagged(TAG_ARCH_VARIANT)
        .tagged(TAG_VARIANT_PREPEND),
      PropertyField::new(
        "sanitize",
        PropertyKind::Struct(PropertyShape::new(vec![
          PropertyField::new("address", PropertyKind::Bool).tagged(TAG_ARCH_VARIANT),
          PropertyField::new("never", PropertyKind::Bool),
        ])),
      ),
      PropertyField::new(
        "untouched",
        PropertyKind::Struct(PropertyShape::new(vec![PropertyField::new("x", PropertyKind::Bool)])),
      ),
    ])
  }

  mod filter {
    use super::*;

    #[test]
    fn keeps_only_arch_variant_fields() {
      let filtered = filter_arch_shape(&owner(), "").unwrap();
      let names: Vec<_> = filtered.fields.iter().map(|f| f.name.as_str()).collect();
      assert_eq!(names, ["srcs", "include_dirs", "sanitize"]);

      let PropertyKind::Struct(sanitize) = &filtered.field("sanitize").unwrap().kind else {
        panic!("sanitize should stay a struct");
      };
      assert!(sanitize.field("address").is_some());
      assert!(sanitize.field("never").is_none());
    }

    #[test]
    fn strips_marker_tags() {
      let filtered = filter_arch_shape(&owner(), "").unwrap();
      assert!(filtered.fields.iter().all(|f| f.tags.is_empty()));
    }

    #[test]
    fn keeps_replace_tag() {
      let shape = PropertyShape::new(vec![
        PropertyField::new("ldflags", PropertyKind::StringList)
          .tagged(TAG_ARCH_VARIANT)
          .tagged(TAG_REPLACE_INSTEAD_OF_APPEND),
      ]);
      let filtered = filter_arch_shape(&shape, "").unwrap();
      assert_eq!(filtered.fields[0].tags, [TAG_REPLACE_INSTEAD_OF_APPEND]);
    }

    #[test]
    fn rejects_unknown_tags() {
      let shape = PropertyShape::new(vec![PropertyField::new(
        "nested",
        PropertyKind::Struct(PropertyShape::new(vec![
          PropertyField::new("x", PropertyKind::Bool)
            .tagged(TAG_ARCH_VARIANT)
            .tagged("sorted"),
        ])),
      )]);
      let err = filter_arch_shape(&shape, "").unwrap_err();
      assert_eq!(
        err,
        ShapeError::UnknownTags {
          field: "nested.x".to_string(),
          tags: vec!["sorted".to_string()]
        }
      );
    }
  }

  mod sharding {
    use super::*;

    fn wide(count: usize) -> PropertyShape {
      PropertyShape::new(
        (0..count)
          .map(|i| {
            PropertyField::new(format!("property_{i:03}"), PropertyKind::Configurable(ValueType::StringList))
              .tagged(TAG_ARCH_VARIANT)
          })
          .collect(),
      )
    }

    #[test]
    fn no_arch_variant_fields_means_no_shards() {
      let shape = PropertyShape::new(vec![PropertyField::new("name", PropertyKind::String)]);
      assert!(create_arch_prop_shards(&shape, MAX_SHARD_NAME_COST).unwrap().is_empty());
    }

    #[test]
    fn small_shapes_fit_one_shard() {
      let shards = create_arch_prop_shards(&owner(), MAX_SHARD_NAME_COST).unwrap();
      assert_eq!(shards.len(), 1);
      assert_eq!(shards[0].index, 0);
    }

    #[test]
    fn large_shapes_are_split_under_budget() {
      // each field costs 12 + 20
      let shards = create_arch_prop_shards(&wide(40), MAX_SHARD_NAME_COST).unwrap();
      assert_eq!(shards.len(), 3);
      for shard in &shards {
        assert!(shard.shape.name_cost() <= MAX_SHARD_NAME_COST);
      }
      let total: usize = shards.iter().map(|s| s.shape.fields.len()).sum();
      assert_eq!(total, 40);
      assert_eq!(shards[1].shape.fields[0].name, "property_015");
    }

    #[test]
    fn oversized_field_gets_its_own_shard() {
      let shards = create_arch_prop_shards(&wide(3), 10).unwrap();
      assert_eq!(shards.len(), 3);
    }

    #[test]
    fn cache_is_keyed_by_structure() {
      let first = arch_prop_shards(&wide(2)).unwrap();
      let again = arch_prop_shards(&wide(2)).unwrap();
      assert!(Arc::ptr_eq(&first, &again));
      assert!(cached_shape_count() >= 1);
    }
  }
}
