//! Demo catalog loaded at startup

use paywall_payments::Resource;
use rust_decimal_macros::dec;

/// Resources served by the demo
pub fn demo_resources() -> Vec<Resource> {
    vec![
        Resource::new("article-1", "Premium Article: Advanced React Patterns", dec!(9.99), "USD")
            .with_description("Learn advanced React patterns and best practices")
            .with_content("Compound components, render props, custom hooks and context patterns."),
        Resource::new("video-1", "Video Course: TypeScript Mastery", dec!(29.99), "USD")
            .with_description("Complete TypeScript course from beginner to expert")
            .with_content("10+ hours of video content with hands-on projects."),
        Resource::new("ebook-1", "E-Book: Web3 Development Guide", dec!(19.99), "USD")
            .with_description("Comprehensive guide to building Web3 applications")
            .with_content("Smart contracts, wallets and decentralized storage from first principles."),
        Resource::new("free-1", "Free Article: Getting Started with React", dec!(0), "USD")
            .with_description("Introduction to React for beginners")
            .with_content("This is free content available to everyone!"),
    ]
}
