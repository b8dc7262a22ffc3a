use serde::{Deserialize, Serialize};
use std::str::FromStr;

/// Product category
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Category {
    Electronics,
    Accessories,
    Stationery,
}

impl Category {
    pub const ALL: [Category; 3] = [
        Category::Electronics,
        Category::Accessories,
        Category::Stationery,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Category::Electronics => "electronics",
            Category::Accessories => "accessories",
            Category::Stationery => "stationery",
        }
    }
}

impl std::fmt::Display for Category {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Category {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "electronics" => Ok(Category::Electronics),
            "accessories" => Ok(Category::Accessories),
            "stationery" => Ok(Category::Stationery),
            other => Err(format!("Unknown category '{}'", other)),
        }
    }
}

/// A catalog record
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Product {
    pub id: u32,
    pub name: String,
    pub description: String,
    pub brand: String,
    pub price: f64,
    pub stock: u32,
    pub category: Category,
    pub rating: f64,
    pub tags: Vec<String>,
    pub popularity: u32,
}

impl Product {
    pub fn in_stock(&self) -> bool {
        self.stock > 0
    }

    /// Lower-cased substring match over the searchable fields
    pub fn matches_search(&self, needle: &str) -> bool {
        let needle = needle.to_lowercase();
        self.name.to_lowercase().contains(&needle)
            || self.description.to_lowercase().contains(&needle)
            || self.brand.to_lowercase().contains(&needle)
            || self.category.as_str().contains(&needle)
            || self.tags.iter().any(|t| t.to_lowercase().contains(&needle))
    }
}

struct Seed {
    name: &'static str,
    description: &'static str,
    brand: &'static str,
    price: f64,
    stock: u32,
    category: Category,
    rating: f64,
    tags: &'static [&'static str],
    popularity: u32,
}

const SEED: &[Seed] = &[
    Seed {
        name: "Wireless Headphones",
        description: "Over-ear noise cancelling headphones with 30h battery",
        brand: "SoundWave",
        price: 149.99,
        stock: 50,
        category: Category::Electronics,
        rating: 4.5,
        tags: &["audio", "bluetooth", "noise-cancelling"],
        popularity: 95,
    },
    Seed {
        name: "Mechanical Keyboard",
        description: "Tenkeyless keyboard with hot-swappable switches",
        brand: "KeyCraft",
        price: 89.99,
        stock: 75,
        category: Category::Electronics,
        rating: 4.7,
        tags: &["keyboard", "gaming", "rgb"],
        popularity: 88,
    },
    Seed {
        name: "USB-C Hub",
        description: "7-in-1 hub with HDMI, SD card reader and 100W passthrough",
        brand: "PortMaster",
        price: 39.99,
        stock: 120,
        category: Category::Accessories,
        rating: 4.2,
        tags: &["usb-c", "adapter", "hdmi"],
        popularity: 76,
    },
    Seed {
        name: "Laptop Stand",
        description: "Adjustable aluminium stand for laptops up to 17 inches",
        brand: "ErgoLift",
        price: 49.99,
        stock: 60,
        category: Category::Accessories,
        rating: 4.4,
        tags: &["ergonomic", "aluminium", "desk"],
        popularity: 70,
    },
    Seed {
        name: "Notebook Set",
        description: "Three dotted A5 notebooks with lay-flat binding",
        brand: "PaperWorks",
        price: 12.99,
        stock: 300,
        category: Category::Stationery,
        rating: 4.1,
        tags: &["paper", "journal", "dotted"],
        popularity: 55,
    },
    Seed {
        name: "Wireless Mouse",
        description: "Silent ergonomic mouse with USB receiver",
        brand: "ClickPro",
        price: 29.99,
        stock: 200,
        category: Category::Electronics,
        rating: 4.3,
        tags: &["mouse", "bluetooth", "ergonomic"],
        popularity: 90,
    },
    Seed {
        name: "27-inch Monitor",
        description: "QHD IPS monitor with 144Hz refresh rate",
        brand: "ViewMax",
        price: 329.99,
        stock: 25,
        category: Category::Electronics,
        rating: 4.6,
        tags: &["display", "gaming", "qhd"],
        popularity: 82,
    },
    Seed {
        name: "Phone Case",
        description: "Shockproof clear case with raised edges",
        brand: "ShieldCo",
        price: 19.99,
        stock: 400,
        category: Category::Accessories,
        rating: 4.0,
        tags: &["phone", "protection"],
        popularity: 65,
    },
    Seed {
        name: "Fountain Pen",
        description: "Steel nib fountain pen with converter",
        brand: "InkWell",
        price: 34.99,
        stock: 80,
        category: Category::Stationery,
        rating: 4.8,
        tags: &["pen", "writing", "ink"],
        popularity: 40,
    },
    Seed {
        name: "HD Webcam",
        description: "1080p webcam with dual microphones and privacy shutter",
        brand: "ClearView",
        price: 69.99,
        stock: 45,
        category: Category::Electronics,
        rating: 4.2,
        tags: &["camera", "video", "streaming"],
        popularity: 72,
    },
    Seed {
        name: "Desk Organizer",
        description: "Bamboo organizer with five compartments",
        brand: "PaperWorks",
        price: 24.99,
        stock: 150,
        category: Category::Stationery,
        rating: 3.9,
        tags: &["desk", "bamboo", "storage"],
        popularity: 35,
    },
    Seed {
        name: "Charging Cable 3-Pack",
        description: "Braided USB-C to USB-C cables, 1m/2m/3m",
        brand: "PortMaster",
        price: 15.99,
        stock: 500,
        category: Category::Accessories,
        rating: 4.1,
        tags: &["usb-c", "cable", "charging"],
        popularity: 85,
    },
];

/// The fixed product list every products service starts from
pub fn seed_products() -> Vec<Product> {
    SEED.iter()
        .enumerate()
        .map(|(i, s)| Product {
            id: i as u32 + 1,
            name: s.name.to_string(),
            description: s.description.to_string(),
            brand: s.brand.to_string(),
            price: s.price,
            stock: s.stock,
            category: s.category,
            rating: s.rating,
            tags: s.tags.iter().map(|t| t.to_string()).collect(),
            popularity: s.popularity,
        })
        .collect()
}
