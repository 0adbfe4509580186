// SPDX-License-Identifier: MIT

//! Services module - external API clients.

pub mod recipes;

pub use recipes::{RecipeClient, RecipeSearch};
