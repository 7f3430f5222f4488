//! Prompt text and fallback payloads for the recommendation oracle.

use channelscope_analysis::AnalysisResult;
use channelscope_shared::{Recommendation, Script, ScriptSection};

pub(crate) const RECOMMEND_SYSTEM: &str = r#"You are an expert YouTube content strategist with 10+ years of experience.
Your task is to analyze YouTube channel data and recommend the TOP 5 video topics that will maximize views and engagement.
Provide your response in valid JSON format with the following structure:
{
    "recommendations": [
        {
            "recommended_topic": "Specific video topic",
            "rationale": "Detailed explanation of why this topic will perform well",
            "target_title": "Click-worthy title (under 60 characters)",
            "title_variations": ["Title 1", "Title 2", "Title 3"],
            "description_template": "Full video description with placeholders",
            "keywords": ["keyword1", "keyword2", "keyword3"],
            "content_structure": ["Hook (0-30s)", "Main point 1", "Main point 2", "Main point 3", "Conclusion/Call to action"],
            "estimated_duration": "X-Y minutes",
            "thumbnail_ideas": ["Idea 1", "Idea 2"],
            "estimated_engagement": {"expected_views": "10k-20k", "engagement_rate": "5-8%"}
        }
    ]
}"#;

pub(crate) const SCRIPT_SYSTEM: &str = r##"You are a professional video scriptwriter. Create engaging, conversational scripts for YouTube videos.
Format the script with clear sections and timing markers. Each section should be 1-2 paragraphs.
Output in JSON format:
{
    "video_title": "Final chosen title",
    "sections": [
        {
            "section_title": "Hook/Introduction",
            "content": "Full script text for this section",
            "duration_seconds": 30,
            "visual_prompt": "Description of what should be shown visually",
            "speaking_style": "energetic, curious, authoritative, etc."
        }
    ],
    "total_duration_seconds": 600,
    "call_to_action": "Subscribe and like the video",
    "hashtags": ["#hashtag1", "#hashtag2"]
}"##;

/// Prompt asking for five ranked recommendations.
pub(crate) fn recommendation_prompt(analysis: &AnalysisResult) -> String {
    format!(
        "Based on the following YouTube channel analysis, recommend the TOP 5 video topics:\n\n\
         {}\n\n\
         Consider:\n\
         1. What has performed well historically\n\
         2. What comparable channels are doing\n\
         3. Current trends in the niche\n\
         4. Content gaps in the channel\n\
         5. Engagement patterns\n\n\
         For each recommendation, provide estimated engagement metrics based on similar content performance.\n\n\
         Provide your recommendations in the specified JSON format.",
        summarize_analysis(analysis)
    )
}

/// Prompt asking for a full script for one recommendation.
pub(crate) fn script_prompt(rec: &Recommendation) -> String {
    let topic = non_empty(&rec.recommended_topic, "General topic");
    let title = non_empty(&rec.target_title, "Video title");
    let duration = non_empty(&rec.estimated_duration, "5-7 minutes");
    format!(
        "Create a complete video script based on this recommendation:\n\n\
         Topic: {topic}\n\
         Title: {title}\n\
         Structure: {:?}\n\
         Duration: {duration}\n\n\
         Create a script that is engaging, informative, and suitable for YouTube. \
         Include hooks, main content, and a call to action.",
        rec.content_structure
    )
}

fn non_empty<'a>(value: &'a str, fallback: &'a str) -> &'a str {
    if value.trim().is_empty() { fallback } else { value }
}

/// Plain-text digest of an analysis, one section per block.
pub fn summarize_analysis(analysis: &AnalysisResult) -> String {
    let metrics = &analysis.channel_metrics;
    let temporal = &analysis.temporal_profile;
    let best = metrics
        .best_item
        .as_ref()
        .map_or("N/A", |b| b.item.title.as_str());
    let or_na = |v: Option<String>| v.unwrap_or_else(|| "N/A".into());

    let mut lines = vec![
        "Channel Metrics:".to_string(),
        format!("- Total Videos: {}", metrics.total_items),
        format!("- Average Views: {:.0}", metrics.avg_views),
        format!("- Average Engagement Rate: {:.3}", metrics.avg_engagement_rate),
        format!("- Best Performing Video: {best}"),
        format!("- Trending Topics: {}", metrics.trending_keywords.join(", ")),
        String::new(),
        "Content Analysis:".to_string(),
        format!(
            "- Average Video Duration: {:.1} minutes",
            analysis.content_profile.avg_duration_seconds / 60.0
        ),
        String::new(),
        "Temporal Analysis:".to_string(),
        format!(
            "- Best Day to Post: {}",
            or_na(temporal.best_day.map(|d| d.to_string()))
        ),
        format!(
            "- Best Hour to Post: {}",
            or_na(temporal.best_hour.map(|h| h.to_string()))
        ),
    ];

    if !analysis.comparison_report.channels.is_empty() {
        lines.push(String::new());
        lines.push("Comparable Channels:".to_string());
        for channel in &analysis.comparison_report.channels {
            lines.push(format!(
                "- {}: Avg {:.0} views",
                channel.channel_title, channel.avg_views
            ));
        }
    }

    if !analysis.recommendations.is_empty() {
        lines.push(String::new());
        lines.push("Initial Recommendations:".to_string());
        for (i, rec) in analysis.recommendations.iter().enumerate() {
            lines.push(format!("{}. {rec}", i + 1));
        }
    }

    lines.join("\n")
}

/// Used when the model's answer cannot be parsed.
pub(crate) fn fallback_recommendation() -> Recommendation {
    Recommendation {
        recommended_topic: "Industry Trends Analysis".into(),
        rationale: "Based on your channel's performance with educational content".into(),
        target_title: "Top Trends You Need to Know".into(),
        title_variations: vec![
            "Industry Secrets Revealed".into(),
            "What Nobody Tells You".into(),
        ],
        description_template: "In this video, we explore...".into(),
        keywords: vec!["trends".into(), "analysis".into(), "industry".into()],
        content_structure: vec![
            "Introduction".into(),
            "Trend 1".into(),
            "Trend 2".into(),
            "Trend 3".into(),
            "Conclusion".into(),
        ],
        estimated_duration: "8-10 minutes".into(),
        thumbnail_ideas: vec!["Eye-catching graphic with text overlay".into()],
        estimated_engagement: serde_json::Value::String(
            "Expected views: 5k-10k, Engagement rate: 3-5%".into(),
        ),
    }
}

/// Used when the model's script cannot be parsed.
pub(crate) fn fallback_script(rec: &Recommendation) -> Script {
    let section = |title: &str, content: &str, secs: u64, visual: &str, style: &str| ScriptSection {
        section_title: title.into(),
        content: content.into(),
        duration_seconds: Some(secs),
        visual_prompt: Some(visual.into()),
        speaking_style: Some(style.into()),
    };

    Script {
        video_title: non_empty(&rec.target_title, "Amazing Video Title").to_string(),
        sections: vec![
            section(
                "Introduction",
                "Welcome everyone! In today's video, we're diving deep into an exciting topic that's been trending lately.",
                30,
                "Host speaking to camera with engaging background",
                "energetic",
            ),
            section(
                "Main Content",
                "Let's break this down into three key points. First, the foundation. Second, the current applications. Third, future implications.",
                180,
                "Text overlays, graphics, and relevant footage",
                "authoritative",
            ),
            section(
                "Conclusion",
                "To wrap up, remember these key takeaways. Implement what you've learned and share your results in the comments!",
                60,
                "Host summarizing with key points on screen",
                "conversational",
            ),
        ],
        total_duration_seconds: Some(270),
        call_to_action: "If you enjoyed this video, please like and subscribe for more content!"
            .into(),
        hashtags: vec!["#education".into(), "#learning".into(), "#content".into()],
    }
}

#[cfg(test)]
mod tests {
    use chrono::Utc;

    use channelscope_shared::ItemRecord;

    use super::*;

    #[test]
    fn summary_lists_every_section() {
        let items = vec![
            ItemRecord::new("a", "Rust async", 100, 10, 2)
                .with_published_at(Some("2024-05-20T15:00:00Z".into())),
            ItemRecord::new("b", "Rust traits", 50, 5, 1),
        ];
        let analysis = channelscope_analysis::analyze("UC", &items, &[], Utc::now());
        let summary = summarize_analysis(&analysis);

        assert!(summary.starts_with("Channel Metrics:"));
        assert!(summary.contains("- Total Videos: 2"));
        assert!(summary.contains("- Average Views: 75"));
        assert!(summary.contains("- Best Performing Video: Rust async"));
        assert!(summary.contains("- Average Video Duration: 5.0 minutes"));
        assert!(summary.contains("- Best Day to Post: Monday"));
        assert!(summary.contains("Initial Recommendations:\n1. "));
        assert!(!summary.contains("Comparable Channels"));
    }

    #[test]
    fn script_prompt_fills_blanks() {
        let prompt = script_prompt(&Recommendation::default());
        assert!(prompt.contains("Topic: General topic"));
        assert!(prompt.contains("Duration: 5-7 minutes"));
    }

    #[test]
    fn fallback_script_uses_target_title() {
        let rec = Recommendation {
            target_title: "Async in 10 minutes".into(),
            ..Recommendation::default()
        };
        let script = fallback_script(&rec);
        assert_eq!(script.video_title, "Async in 10 minutes");
        assert_eq!(script.sections.len(), 3);
        assert_eq!(fallback_script(&Recommendation::default()).video_title, "Amazing Video Title");
    }
}
