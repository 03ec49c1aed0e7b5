use fanout::{Deadline, ListResources, TaskPool, execute_batch};
use proptest::prelude::*;
use std::convert::Infallible;
use std::time::Duration;

fn runtime() -> tokio::runtime::Runtime {
    tokio::runtime::Builder::new_multi_thread()
        .worker_threads(4)
        .enable_time()
        .build()
        .expect("Failed to build test runtime")
}

#[cfg(test)]
mod ordering_property_tests {
    use super::*;

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(32))]

        #[test]
        fn test_results_are_positional(
            entries in prop::collection::vec(("[a-e]{1,3}", 0u64..15), 0..80),
            capacity in 1usize..6
        ) {
            let keys: Vec<String> = entries
                .iter()
                .map(|(name, delay)| format!("{name}:{delay}"))
                .collect();

            let results = runtime().block_on(async {
                let pool = TaskPool::new(capacity);
                execute_batch(&pool, keys.clone(), Deadline::Unbounded, |key| async move {
                    let delay = key
                        .rsplit_once(':')
                        .and_then(|(_, ms)| ms.parse().ok())
                        .unwrap_or(0);
                    tokio::time::sleep(Duration::from_millis(delay)).await;
                    Ok::<_, Infallible>(key.len())
                })
                .await
            });

            // Property: one result per key, in input order, duplicates included
            let results = results.expect("no unit can fail");
            prop_assert_eq!(results.len(), keys.len());
            for (key, len) in keys.iter().zip(results.iter()) {
                prop_assert_eq!(key.len(), *len);
            }
        }

        #[test]
        fn test_filtered_fetch_matches_sequential_filter(
            universe in prop::collection::vec("[a-d][0-9]", 0..20),
            prefix in "[a-d]"
        ) {
            let expected: Vec<String> = universe
                .iter()
                .filter(|key| key.starts_with(prefix.as_str()))
                .cloned()
                .collect();

            let fetched = runtime().block_on(async {
                let api = std::sync::Arc::new(StaticSource(universe.clone()));
                ListResources::new(TaskPool::new(3), api)
                    .execute_matching(|key| key.starts_with(prefix.as_str()))
                    .await
            });

            // Property: predicate filtering keeps survivors in universe order
            prop_assert_eq!(fetched.expect("static source never fails"), expected);
        }
    }

    struct StaticSource(Vec<String>);

    #[async_trait::async_trait]
    impl fanout::KeySource for StaticSource {
        type Resource = String;
        type Error = std::io::Error;

        async fn list_keys(&self) -> Result<Vec<String>, Self::Error> {
            Ok(self.0.clone())
        }

        async fn fetch(&self, key: &str) -> Result<String, Self::Error> {
            Ok(key.to_string())
        }
    }
}
