use anyhow::Result;
use storybook_application::CachedBookRepository;

pub async fn stats(repository: &CachedBookRepository) -> Result<()> {
    let stats = repository.stats().await?;
    println!("{}", serde_json::to_string_pretty(&stats)?);
    Ok(())
}

pub async fn refresh(repository: &CachedBookRepository) -> Result<()> {
    let stats = repository.refresh().await?;
    tracing::info!("Reloaded {} books from disk", stats.cached_count);
    println!("{}", serde_json::to_string_pretty(&stats)?);
    Ok(())
}
