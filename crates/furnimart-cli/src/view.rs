//! Plain-text rendering of listings for the terminal.

use furnimart_core::models::{ListingDetail, ListingSummary, Page};

/// Width of the title column in listing tables
const TITLE_WIDTH: usize = 32;

pub fn print_page(page: &Page<ListingSummary>, number: u32) {
    if page.results.is_empty() {
        println!("No listings on page {}", number);
        return;
    }
    print_rows(&page.results);
    println!();
    println!("Page {} ({} listings total)", number, page.count);
    if page.has_next() {
        if let Some(hint) = next_page_hint(number) {
            println!("{}", hint);
        }
    }
}

fn next_page_hint(number: u32) -> Option<String> {
    number
        .checked_add(1)
        .map(|next| format!("More: furnimart browse --page {}", next))
}

pub fn print_summaries(listings: &[ListingSummary], heading: &str) {
    println!("{} ({})", heading, listings.len());
    if listings.is_empty() {
        println!("  nothing here yet");
        return;
    }
    print_rows(listings);
}

fn print_rows(listings: &[ListingSummary]) {
    for l in listings {
        println!(
            "{:>6}  {:<width$}  {:>12}  {:<10}  {}",
            format!("#{}", l.id),
            truncate(&l.title, TITLE_WIDTH),
            l.display_price(),
            l.category.as_str(),
            l.status.display_name(),
            width = TITLE_WIDTH
        );
    }
}

pub fn print_listing(listing: &ListingDetail) {
    println!("#{} {}", listing.id, listing.title);
    println!("  Price:      {}", listing.display_price());
    println!("  Category:   {}", listing.category.as_str());
    println!("  Condition:  {}", listing.condition_label());
    println!("  Status:     {}", listing.status.display_name());
    if let Some(seller) = &listing.seller {
        println!("  Seller:     {}", seller.username);
    }
    println!("  Listed:     {}", listing.created_at.format("%Y-%m-%d"));

    if !listing.description.is_empty() {
        println!();
        for line in listing.description.lines() {
            println!("  {}", line);
        }
    }

    let images = listing.ordered_images();
    if !images.is_empty() {
        println!();
        println!("  Images:");
        for image in images {
            println!(
                "    [{}] {}",
                image.id,
                image.image_url.as_deref().unwrap_or("(processing)")
            );
        }
    }
}

/// Shorten `s` to at most `max` characters, marking the cut with "...".
fn truncate(s: &str, max: usize) -> String {
    if s.chars().count() <= max {
        return s.to_string();
    }
    let kept: String = s.chars().take(max.saturating_sub(3)).collect();
    format!("{}...", kept)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_truncate() {
        assert_eq!(truncate("Oak table", 32), "Oak table");
        assert_eq!(truncate("abcdefghij", 8), "abcde...");
        assert_eq!(truncate("ééééé", 4), "é...");
    }

    #[test]
    fn test_next_page_hint_stops_at_last_page_number() {
        assert_eq!(next_page_hint(1).as_deref(), Some("More: furnimart browse --page 2"));
        assert_eq!(next_page_hint(u32::MAX), None);
    }
}
