//! Side-by-side metrics for comparison channels.

use serde::{Deserialize, Serialize};

use channelscope_shared::{ComparisonChannel, ItemRecord};

use crate::metrics::{RankedItem, best_item, mean};

/// Averaged metrics of one comparison channel.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChannelComparison {
    pub channel_id: String,
    pub channel_title: String,
    pub avg_views: f64,
    pub avg_likes: f64,
    pub avg_engagement_rate: f64,
    pub item_count: usize,
    pub best_item: Option<RankedItem>,
}

/// One entry per comparison channel that has items, in input order.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ComparisonReport {
    pub channels: Vec<ChannelComparison>,
}

/// Summarise each comparison channel. Channels without items are skipped.
///
/// The subject channel's items are accepted for symmetry with the other
/// analysis passes; the comparison itself only reads the channels.
pub fn compare_with_channels(
    _items: &[ItemRecord],
    channels: &[ComparisonChannel],
) -> ComparisonReport {
    let channels = channels
        .iter()
        .filter(|c| !c.items.is_empty())
        .map(|c| ChannelComparison {
            channel_id: c.id.clone(),
            channel_title: c.title.clone(),
            avg_views: mean(c.items.iter().map(|i| i.views as f64)),
            avg_likes: mean(c.items.iter().map(|i| i.likes as f64)),
            avg_engagement_rate: mean(c.items.iter().map(|i| i.engagement_rate)),
            item_count: c.items.len(),
            best_item: best_item(&c.items),
        })
        .collect();

    ComparisonReport { channels }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn channel(id: &str, items: Vec<ItemRecord>) -> ComparisonChannel {
        ComparisonChannel {
            id: id.into(),
            title: format!("{id} title"),
            description: String::new(),
            items,
        }
    }

    #[test]
    fn averages_per_channel() {
        let report = compare_with_channels(
            &[],
            &[channel(
                "UCa",
                vec![
                    ItemRecord::new("a1", "one", 200, 20, 0),
                    ItemRecord::new("a2", "two", 100, 5, 5),
                ],
            )],
        );
        let entry = &report.channels[0];
        assert_eq!(entry.channel_id, "UCa");
        assert_eq!(entry.channel_title, "UCa title");
        assert_eq!(entry.item_count, 2);
        assert_eq!(entry.avg_views, 150.0);
        assert_eq!(entry.avg_likes, 12.5);
        assert!((entry.avg_engagement_rate - 0.1).abs() < 1e-12);
        assert_eq!(
            entry.best_item.as_ref().map(|b| b.item.id.as_str()),
            Some("a1")
        );
    }

    #[test]
    fn empty_channels_are_skipped() {
        let report = compare_with_channels(
            &[],
            &[
                channel("UCempty", vec![]),
                channel("UCb", vec![ItemRecord::new("b1", "t", 1, 0, 0)]),
            ],
        );
        assert_eq!(report.channels.len(), 1);
        assert_eq!(report.channels[0].channel_id, "UCb");
    }
}
