use super::error::{ProfileError, ProfileResult};
use super::node::{CONFIGURE_KEY, Node, Tree, accumulate};

/// Deep-merges `patch` into `base`.
///
/// Later values win, except scalar `configure` values which are appended to
/// the existing ones.
pub fn merge_trees(base: &mut Tree, patch: Tree) -> ProfileResult<()> {
    merge_at(base, patch, &mut Vec::new())
}

fn merge_at(base: &mut Tree, patch: Tree, path: &mut Vec<String>) -> ProfileResult<()> {
    for (key, value) in patch {
        path.push(key.clone());
        match (base.get_mut(&key), value) {
            (Some(Node::Mapping(existing)), Node::Mapping(child)) => {
                merge_at(existing, child, path)?;
            }
            (existing, Node::Scalar(addition)) if key == CONFIGURE_KEY => {
                let current = match existing {
                    None | Some(Node::Null) => "",
                    Some(Node::Scalar(current)) => current.as_str(),
                    Some(Node::Mapping(_)) => {
                        return Err(ProfileError::MergeConflict(path.join(".")));
                    }
                };
                let merged = accumulate(&key, current, &addition);
                base.insert(key, Node::Scalar(merged));
            }
            (Some(Node::Mapping(_)), Node::Scalar(_)) | (Some(Node::Scalar(_)), Node::Mapping(_)) => {
                return Err(ProfileError::MergeConflict(path.join(".")));
            }
            (_, value) => {
                base.insert(key, value);
            }
        }
        path.pop();
    }
    Ok(())
}
