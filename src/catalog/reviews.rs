//! Synthetic product reviews

use rand::seq::SliceRandom;
use rand::Rng;
use serde::{Deserialize, Serialize};

use super::product::Product;

const AUTHORS: &[&str] = &[
    "alex", "sam", "jordan", "taylor", "morgan", "casey", "riley", "jamie", "quinn", "avery",
];

const POSITIVE: &[&str] = &[
    "Exactly as described, would buy again.",
    "Great value for the price.",
    "Solid build quality and fast shipping.",
    "Use it every day, no complaints.",
];

const NEUTRAL: &[&str] = &[
    "Does the job, nothing special.",
    "Decent, but the packaging could be better.",
    "Works fine after a short setup.",
];

const NEGATIVE: &[&str] = &[
    "Stopped working after a few weeks.",
    "Not what I expected from the photos.",
];

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Review {
    pub id: String,
    pub product_id: u32,
    pub author: String,
    pub rating: u8,
    pub comment: String,
    pub verified_purchase: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReviewSummary {
    pub product_id: u32,
    pub average_rating: f64,
    pub review_count: usize,
    pub reviews: Vec<Review>,
}

/// Generate between 3 and 6 reviews scattered around the product rating
pub fn generate_reviews<R: Rng + ?Sized>(product: &Product, rng: &mut R) -> ReviewSummary {
    let count = rng.gen_range(3..=6);

    let reviews: Vec<Review> = (0..count)
        .map(|i| {
            let jitter: f64 = rng.gen_range(-1.5..=1.0);
            let rating = (product.rating + jitter).round().clamp(1.0, 5.0) as u8;
            let pool = match rating {
                4..=5 => POSITIVE,
                3 => NEUTRAL,
                _ => NEGATIVE,
            };

            Review {
                id: format!("rev-{}-{}", product.id, i + 1),
                product_id: product.id,
                author: AUTHORS.choose(rng).copied().unwrap_or("anonymous").to_string(),
                rating,
                comment: pool.choose(rng).copied().unwrap_or_default().to_string(),
                verified_purchase: rng.gen_bool(0.8),
            }
        })
        .collect();

    let average_rating = if reviews.is_empty() {
        0.0
    } else {
        let sum: u32 = reviews.iter().map(|r| r.rating as u32).sum();
        (sum as f64 / reviews.len() as f64 * 10.0).round() / 10.0
    };

    ReviewSummary {
        product_id: product.id,
        average_rating,
        review_count: reviews.len(),
        reviews,
    }
}
