use std::collections::HashMap;

use async_trait::async_trait;
use tokio::sync::RwLock;

use super::{rank, IndexMatch, IndexRecord, SemanticIndex};

/// Process-local index. Used in tests and when no database index is
/// wanted; contents are lost on restart and rebuilt by `sync`.
#[derive(Default)]
pub struct InMemoryIndex {
    records: RwLock<HashMap<String, IndexRecord>>,
}

impl InMemoryIndex {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn len(&self) -> usize {
        self.records.read().await.len()
    }

    pub async fn ids(&self) -> Vec<String> {
        let mut ids: Vec<String> = self.records.read().await.keys().cloned().collect();
        ids.sort();
        ids
    }

    pub async fn get(&self, id: &str) -> Option<IndexRecord> {
        self.records.read().await.get(id).cloned()
    }
}

#[async_trait]
impl SemanticIndex for InMemoryIndex {
    async fn query(
        &self,
        vector: &[f32],
        top_k: usize,
        with_metadata: bool,
    ) -> anyhow::Result<Vec<IndexMatch>> {
        let records = self.records.read().await;
        Ok(rank(
            vector,
            records
                .values()
                .map(|r| (r.id.as_str(), r.vector.as_slice(), &r.metadata)),
            top_k,
            with_metadata,
        ))
    }

    async fn upsert(&self, records: Vec<IndexRecord>) -> anyhow::Result<usize> {
        let count = records.len();
        let mut map = self.records.write().await;
        for record in records {
            map.insert(record.id.clone(), record);
        }
        Ok(count)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::foods::dto::{FoodSource, ReferenceFoodRow};
    use crate::index::record_id;

    fn record(name: &str, vector: Vec<f32>, calories: f64) -> IndexRecord {
        IndexRecord {
            id: record_id(name, "n"),
            vector,
            metadata: ReferenceFoodRow {
                name: name.into(),
                unit: "n".into(),
                base_quantity: 1.0,
                calories,
                protein: 0.0,
                fat: 0.0,
                carbs: 0.0,
                vitamins: None,
                source: FoodSource::Curated,
            },
        }
    }

    #[tokio::test]
    async fn query_ranks_by_similarity_and_limits() {
        let index = InMemoryIndex::new();
        index
            .upsert(vec![
                record("egg", vec![1.0, 0.0], 78.0),
                record("omelette", vec![0.8, 0.6], 150.0),
                record("rice", vec![0.0, 1.0], 200.0),
            ])
            .await
            .unwrap();

        let hits = index.query(&[1.0, 0.0], 2, true).await.unwrap();
        assert_eq!(hits.len(), 2);
        assert_eq!(hits[0].metadata.as_ref().unwrap().name, "egg");
        assert_eq!(hits[1].metadata.as_ref().unwrap().name, "omelette");
        assert!(hits[0].score > hits[1].score);

        let bare = index.query(&[1.0, 0.0], 1, false).await.unwrap();
        assert!(bare[0].metadata.is_none());
    }

    #[tokio::test]
    async fn upsert_overwrites_same_id() {
        let index = InMemoryIndex::new();
        index.upsert(vec![record("egg", vec![1.0], 70.0)]).await.unwrap();
        index.upsert(vec![record("egg", vec![1.0], 78.0)]).await.unwrap();
        assert_eq!(index.len().await, 1);
        let stored = index.get(&record_id("egg", "n")).await.unwrap();
        assert_eq!(stored.metadata.calories, 78.0);
    }
}
