//! `extent`: the dataset's first and last week.

use crate::source::SourceArgs;
use vmap_core::service::DEFAULT_DATE_FIELD;
use vmap_core::time_extent::TimeExtent;
use vmap_timeline::DateRangeResolver;
use vmap_utils::dates::{format_date, weeks_between};

pub async fn run_extent(source: &SourceArgs) -> anyhow::Result<()> {
    let source = source.open().await?;
    let extent = DateRangeResolver::new(source, DEFAULT_DATE_FIELD)
        .resolve()
        .await?;
    println!("{}", describe_extent(&extent));
    Ok(())
}

/// `start end (N weeks)`.
pub fn describe_extent(extent: &TimeExtent) -> String {
    format!(
        "{} {} ({} weeks)",
        format_date(&extent.start()),
        format_date(&extent.end()),
        weeks_between(&extent.start(), &extent.end()) + 1
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::source::tests::sample_args;

    #[tokio::test]
    async fn describes_sample_extent() {
        let source = sample_args("extent").open().await.unwrap();
        let extent = DateRangeResolver::new(source, DEFAULT_DATE_FIELD)
            .resolve()
            .await
            .unwrap();
        assert_eq!(describe_extent(&extent), "2021-01-03 2021-01-17 (3 weeks)");
    }
}
