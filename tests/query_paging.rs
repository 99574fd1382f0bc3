use std::sync::Arc;

use anyhow::Result;
use quaydsl::testing::MemoryTemplate;
use quaydsl::{
    DocumentQuery, OrderSpecifier, PageRequest, Predicate, ScanConsistency, SortDirection,
};
use serde::Deserialize;
use serde_json::json;

#[derive(Debug, Deserialize)]
struct Airline {
    id: String,
}

fn airlines() -> Arc<MemoryTemplate> {
    let template = Arc::new(MemoryTemplate::new());
    template.insert_many(
        "airlines",
        vec![
            json!({"id": "1", "name": "United Airlines"}),
            json!({"id": "2", "name": "Lufthansa"}),
            json!({"id": "3", "name": "Air France"}),
            json!({"id": "4", "name": "KLM"}),
            json!({"id": "5", "name": "Iberia"}),
            json!({"id": "6", "name": "Swiss"}),
        ],
    );
    template
}

fn query(template: &Arc<MemoryTemplate>) -> DocumentQuery<Airline> {
    DocumentQuery::new(template.clone(), "airlines")
}

#[tokio::test]
async fn fetch_page_windows_content_and_counts_everything() -> Result<()> {
    let template = airlines();

    let page = query(&template)
        .build()
        .await?
        .fetch_page(PageRequest::new(0, 2).with_sort(vec![OrderSpecifier::asc("id")]))
        .await?;
    assert_eq!(page.total, 6);
    assert_eq!(page.total_pages(), 3);
    let ids: Vec<&str> = page.content.iter().map(|a| a.id.as_str()).collect();
    assert_eq!(ids, ["1", "2"]);

    let page = query(&template)
        .build()
        .await?
        .fetch_page(PageRequest::new(2, 2).with_sort(vec![OrderSpecifier::asc("id")]))
        .await?;
    let ids: Vec<&str> = page.content.iter().map(|a| a.id.as_str()).collect();
    assert_eq!(ids, ["5", "6"]);

    // a page past the end is empty but still reports the full total
    let page = query(&template)
        .build()
        .await?
        .fetch_page(PageRequest::new(3, 2))
        .await?;
    assert!(page.is_empty());
    assert_eq!(page.total, 6);
    Ok(())
}

#[tokio::test]
async fn fetch_page_applies_the_filter_to_both_queries() -> Result<()> {
    let template = airlines();
    let page = query(&template)
        .filter(Predicate::r#in("id", ["1", "2", "3"]))
        .build()
        .await?
        .fetch_page(PageRequest::new(0, 2).with_sort(vec![OrderSpecifier::asc("id")]))
        .await?;
    assert_eq!(page.total, 3);
    assert_eq!(page.len(), 2);
    Ok(())
}

#[tokio::test]
async fn fetch_count_ignores_the_builder_window() -> Result<()> {
    let template = airlines();
    let count = query(&template)
        .limit(1)
        .offset(1)
        .build()
        .await?
        .fetch_count()
        .await?;
    assert_eq!(count, 6);
    Ok(())
}

#[tokio::test]
async fn limit_and_offset_window_fetch_all() -> Result<()> {
    let template = airlines();
    let found = query(&template)
        .order_by("id", SortDirection::Desc)
        .offset(1)
        .limit(2)
        .build()
        .await?
        .fetch_all()
        .await?;
    let ids: Vec<&str> = found.iter().map(|a| a.id.as_str()).collect();
    assert_eq!(ids, ["5", "4"]);
    Ok(())
}

#[tokio::test]
async fn customizer_adjusts_the_assembled_spec() -> Result<()> {
    let template = airlines();

    let bound = query(&template)
        .customize(|spec| spec.set_consistency(ScanConsistency::RequestPlus))
        .build()
        .await?;
    assert_eq!(bound.spec().consistency(), ScanConsistency::RequestPlus);

    let found = query(&template)
        .order_by("id", SortDirection::Asc)
        .customize(|spec| spec.set_limit(Some(2)))
        .build()
        .await?
        .fetch_all()
        .await?;
    assert_eq!(found.len(), 2);
    Ok(())
}

#[tokio::test]
async fn spec_display_is_the_query_export() -> Result<()> {
    let template = airlines();

    let bound = query(&template)
        .filter(Predicate::eq("name", "Swiss"))
        .order_by("name", SortDirection::Asc)
        .offset(1)
        .limit(5)
        .build()
        .await?;
    assert_eq!(
        bound.spec().to_string(),
        "find( WHERE name = $1).sort(name: asc).skip(1).limit(5)"
    );

    let bound = query(&template).build().await?;
    assert_eq!(bound.spec().to_string(), "find({})");
    Ok(())
}
