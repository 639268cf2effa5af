use anyhow::{Context, Result};
use storybook_application::CachedBookRepository;
use storybook_core::book::{Book, BookRepository, BookStatus};

pub async fn list(repository: &CachedBookRepository) -> Result<()> {
    let mut books = repository.get_all().await?;
    // Newest first, like the book shelf.
    books.sort_by(|a, b| b.created_at.cmp(&a.created_at));

    if books.is_empty() {
        println!("No books found.");
        return Ok(());
    }

    println!("{:<36}  {:<8}  {:>5}  {:<19}  TITLE", "ID", "STATUS", "PAGES", "CREATED");
    for book in &books {
        println!(
            "{:<36}  {:<8}  {:>5}  {:<19}  {}",
            book.id,
            book.status,
            book.pages.len(),
            book.created_at.format("%Y-%m-%d %H:%M:%S"),
            book.title
        );
    }
    Ok(())
}

pub async fn show(repository: &CachedBookRepository, id: &str) -> Result<()> {
    let book = repository
        .get(id)
        .await?
        .with_context(|| format!("Book not found: {}", id))?;
    println!("{}", serde_json::to_string_pretty(&book)?);
    Ok(())
}

pub async fn create(
    repository: &CachedBookRepository,
    title: String,
    cover: String,
    status: BookStatus,
) -> Result<()> {
    let mut book = Book::new(title, cover);
    book.status = status;

    let created = repository.create(book).await?;
    tracing::info!("Created book {} ({})", created.id, created.status);
    println!("{}", serde_json::to_string_pretty(&created.summary())?);
    Ok(())
}

pub async fn set_status(
    repository: &CachedBookRepository,
    id: &str,
    status: BookStatus,
) -> Result<()> {
    let mut book = repository
        .get(id)
        .await?
        .with_context(|| format!("Book not found: {}", id))?;
    book.status = status;

    let updated = repository.update(id, book).await?;
    tracing::info!("Book {} is now {}", id, updated.status);
    println!("{}", serde_json::to_string_pretty(&updated.summary())?);
    Ok(())
}

pub async fn delete(repository: &CachedBookRepository, id: &str) -> Result<()> {
    if repository.delete(id).await? {
        tracing::info!("Deleted book {}", id);
        println!("Deleted {}", id);
    } else {
        println!("Nothing to delete for {}", id);
    }
    Ok(())
}
