/// Joins several sequences in order without repeating elements.
///
/// The first sequence is taken verbatim. Each later sequence contributes the
/// elements not already present in the joined result so far.
pub fn join_list_without_repeat<T, L>(lists: &[L]) -> Vec<T>
where
    T: Clone + PartialEq,
    L: AsRef<[T]>,
{
    let mut lists = lists.iter();
    let Some(first) = lists.next() else {
        return Vec::new();
    };

    let mut joined = first.as_ref().to_vec();
    for list in lists {
        let additions: Vec<T> = list
            .as_ref()
            .iter()
            .filter(|item| !joined.contains(*item))
            .cloned()
            .collect();
        joined.extend(additions);
    }
    joined
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_join_numbers() {
        let joined = join_list_without_repeat(&[vec![1, 2, 3], vec![2, 3, 4], vec![4, 5]]);
        assert_eq!(joined, vec![1, 2, 3, 4, 5]);
    }

    #[test]
    fn test_join_column_names() {
        let joined = join_list_without_repeat(&[&["id", "timestamp"][..], &["timestamp", "value"][..]]);
        assert_eq!(joined, vec!["id", "timestamp", "value"]);
    }

    #[test]
    fn test_first_list_kept_verbatim() {
        let joined = join_list_without_repeat(&[vec!["a", "a"], vec!["a", "b"]]);
        assert_eq!(joined, vec!["a", "a", "b"]);
    }

    #[test]
    fn test_empty_input() {
        let lists: [Vec<u8>; 0] = [];
        assert!(join_list_without_repeat(&lists).is_empty());
    }
}
