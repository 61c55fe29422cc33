//! Command-line interface for operating the engine against a live backend.
//!
//! Every subcommand prints one JSON document to stdout. Failures are printed
//! as an [`ApiError`](crate::ApiError) JSON document to stderr.

use clap::{Parser, Subcommand};
use decilo_core::TemplateId;
use serde::Serialize;

use crate::error::ApiResult;
use crate::service::{parse_options, parse_size, PortalApi};
use crate::types::{ListProductsRequest, ResolveRequest, VariantImageRequest};

#[derive(Debug, Parser)]
#[command(
    name = "decilo",
    about = "Query the product catalog and resolve variants",
    version
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Print compact JSON instead of pretty-printed
    #[arg(long, global = true)]
    pub compact: bool,
}

#[derive(Debug, Subcommand)]
pub enum Commands {
    /// List products
    Products {
        /// Case-insensitive name filter
        #[arg(short, long)]
        search: Option<String>,

        #[arg(short, long)]
        limit: Option<usize>,

        #[arg(short, long, default_value_t = 0)]
        offset: usize,
    },

    /// Show one product with its attributes and variants
    Product {
        /// Template id
        id: i64,
    },

    /// Resolve a selection to a variant
    Resolve {
        /// Template id
        template: i64,

        /// Chosen option as Attribute=Value, repeatable
        #[arg(short = 'O', long = "option")]
        options: Vec<String>,

        /// Locale the names are spelled in
        #[arg(long)]
        locale: Option<String>,
    },

    /// List exclusion rules of a product
    Exclusions {
        /// Template id
        template: i64,
    },

    /// Fetch the image of the variant a selection resolves to
    Image {
        /// Template id
        template: i64,

        #[arg(short = 'O', long = "option")]
        options: Vec<String>,

        /// thumbnail, small, medium, large, original or a pixel size
        #[arg(short, long, default_value = "medium")]
        size: String,
    },
}

impl Cli {
    /// Run the command and render its JSON output.
    pub async fn execute(&self, api: &PortalApi) -> ApiResult<String> {
        match &self.command {
            Commands::Products {
                search,
                limit,
                offset,
            } => {
                let request = ListProductsRequest {
                    search: search.clone(),
                    limit: *limit,
                    offset: *offset,
                };
                self.render(&api.products(&request).await?)
            }
            Commands::Product { id } => self.render(&api.product(TemplateId::from_raw(*id)).await?),
            Commands::Resolve {
                template,
                options,
                locale,
            } => {
                let request = ResolveRequest {
                    template_id: TemplateId::from_raw(*template),
                    options: parse_options(options)?,
                    locale: locale.clone(),
                };
                self.render(&api.resolve(&request).await?)
            }
            Commands::Exclusions { template } => {
                self.render(&api.exclusions(TemplateId::from_raw(*template)).await?)
            }
            Commands::Image {
                template,
                options,
                size,
            } => {
                let request = VariantImageRequest {
                    template_id: TemplateId::from_raw(*template),
                    options: parse_options(options)?,
                    size: parse_size(size)?,
                };
                self.render(&api.image(&request).await?)
            }
        }
    }

    pub fn render<T: Serialize>(&self, value: &T) -> ApiResult<String> {
        let rendered = if self.compact {
            serde_json::to_string(value)?
        } else {
            serde_json::to_string_pretty(value)?
        };
        Ok(rendered)
    }
}
