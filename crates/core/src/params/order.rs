use super::Parameter;

/// Sort parameters ascending by id.
///
/// Parameters without a numeric id sort after every numbered one. Equal ids
/// keep their input order.
pub fn sort_by_id(params: Vec<&Parameter>) -> Vec<&Parameter> {
    merge_sort_by_key(params, &|p: &&Parameter| (p.id().is_none(), p.id()))
}

/// Stable top-down merge sort.
pub fn merge_sort_by_key<T, K, F>(mut items: Vec<T>, key: &F) -> Vec<T>
where
    K: Ord,
    F: Fn(&T) -> K,
{
    if items.len() <= 1 {
        return items;
    }
    let right = items.split_off(items.len() / 2);
    let left = merge_sort_by_key(items, key);
    let right = merge_sort_by_key(right, key);
    merge(left, right, key)
}

fn merge<T, K, F>(left: Vec<T>, right: Vec<T>, key: &F) -> Vec<T>
where
    K: Ord,
    F: Fn(&T) -> K,
{
    let mut out = Vec::with_capacity(left.len() + right.len());
    let mut left = left.into_iter().peekable();
    let mut right = right.into_iter().peekable();
    loop {
        let take_right = match (left.peek(), right.peek()) {
            (Some(l), Some(r)) => key(r) < key(l),
            (Some(_), None) => false,
            (None, Some(_)) => true,
            (None, None) => break,
        };
        let next = if take_right {
            right.next()
        } else {
            left.next()
        };
        out.extend(next);
    }
    out
}
