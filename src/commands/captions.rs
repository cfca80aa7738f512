// Caption command handlers: generate, regenerate, confirm
use crate::error::InputError;
use crate::models::{CaptionSet, FeedbackRecord, ImageReference, RetrainingJob};
use crate::CaptionLoop;
use log::{debug, error, info};
use serde::Serialize;

#[derive(Debug, Clone, Serialize)]
pub struct CaptionsPayload {
    pub image: ImageReference,
    pub captions: Vec<String>,
    pub attempts: u32,
    /// Fewer than the requested captions were found within the sampling budget
    pub exhausted: bool,
}

#[derive(Debug, Clone, Serialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum RetrainingOutcome {
    Started { job: RetrainingJob },
    Skipped { reason: String },
}

#[derive(Debug, Clone, Serialize)]
pub struct ConfirmPayload {
    pub record: FeedbackRecord,
    pub retraining: RetrainingOutcome,
}

fn offer(app: &CaptionLoop, image: ImageReference, set: CaptionSet) -> CaptionsPayload {
    app.offer(&image, &set);
    CaptionsPayload {
        attempts: set.attempts,
        exhausted: set.exhausted,
        captions: set.into_captions(),
        image,
    }
}

/// Fresh candidate set for an image path or URL
pub fn generate_captions(
    app: &CaptionLoop,
    image: String,
    target_count: Option<usize>,
) -> Result<CaptionsPayload, String> {
    let image = ImageReference::parse(&image).map_err(|e| e.to_string())?;
    let settings = app.settings();

    let set = app
        .engine()
        .generate(
            &image,
            target_count.unwrap_or(settings.target_count),
            settings.sampling_budget,
        )
        .map_err(|e| e.to_string())?;

    debug!("Generated {} captions for {}", set.len(), image);
    Ok(offer(app, image, set))
}

/// Another batch for the same image, optionally keeping what was shown before
pub fn regenerate_captions(
    app: &CaptionLoop,
    image: String,
    carry_forward_previous: bool,
    target_count: Option<usize>,
) -> Result<CaptionsPayload, String> {
    let image = ImageReference::parse(&image).map_err(|e| e.to_string())?;
    let settings = app.settings();
    let previous = app.offered_for(&image);

    let set = app
        .engine()
        .regenerate(
            &image,
            &previous,
            carry_forward_previous,
            target_count.unwrap_or(settings.target_count),
            settings.sampling_budget,
        )
        .map_err(|e| e.to_string())?;

    debug!(
        "Regenerated {} captions for {} (carried forward: {})",
        set.len(),
        image,
        carry_forward_previous
    );
    Ok(offer(app, image, set))
}

/// Record the user's choice and, when enabled, start retraining.
/// A failed append returns an error before any retraining is attempted.
pub fn confirm_caption(
    app: &CaptionLoop,
    image: String,
    caption: String,
) -> Result<ConfirmPayload, String> {
    let image = ImageReference::parse(&image).map_err(|e| e.to_string())?;
    let chosen = caption.trim();
    if chosen.is_empty() {
        return Err(InputError::EmptyCaption.to_string());
    }
    if !app.offered_for(&image).iter().any(|offered| offered == chosen) {
        return Err(InputError::UnknownCaption(chosen.to_string()).to_string());
    }

    let record = FeedbackRecord::new(image, chosen);
    app.ledger().append(&record).map_err(|e| {
        error!("Failed to record feedback for {}: {}", record.image_reference, e);
        e.to_string()
    })?;

    let retraining = if !app.settings().retrain_on_confirm {
        RetrainingOutcome::Skipped {
            reason: "retraining on confirm is disabled".to_string(),
        }
    } else {
        match app.orchestrator().trigger_retraining() {
            Ok(job) => RetrainingOutcome::Started { job },
            Err(e) => {
                info!("Feedback recorded without retraining: {}", e);
                RetrainingOutcome::Skipped { reason: e.to_string() }
            }
        }
    };

    Ok(ConfirmPayload { record, retraining })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::app::tests::setup;
    use crate::models::Settings;

    #[test]
    fn test_generate_uses_settings() {
        let (_dir, app, image) = setup();
        app.replace_settings(Settings {
            target_count: 2,
            ..Settings::default()
        })
        .unwrap();

        let payload = generate_captions(&app, image, None).unwrap();
        assert_eq!(payload.captions, vec!["a dog", "a dog running"]);
        assert_eq!(payload.attempts, 1);
        assert!(!payload.exhausted);
    }

    #[test]
    fn test_generate_rejects_bad_references() {
        let (_dir, app, _image) = setup();
        assert!(generate_captions(&app, "   ".to_string(), None).is_err());
        assert!(generate_captions(&app, "ftp://example.com/a.jpg".to_string(), None).is_err());
        assert!(generate_captions(&app, "/no/such/image.jpg".to_string(), None).is_err());
    }

    #[test]
    fn test_regenerate_carries_forward() {
        let (_dir, app, image) = setup();
        let first = generate_captions(&app, image.clone(), Some(2)).unwrap();
        let second = regenerate_captions(&app, image, true, Some(2)).unwrap();

        assert_eq!(second.captions.len(), first.captions.len() + 2);
        assert_eq!(&second.captions[..2], &first.captions[..]);
    }

    #[test]
    fn test_confirm_requires_offered_caption() {
        let (_dir, app, image) = setup();
        generate_captions(&app, image.clone(), None).unwrap();

        let err = confirm_caption(&app, image.clone(), "a cat".to_string()).unwrap_err();
        assert!(err.contains("a cat"));
        assert!(confirm_caption(&app, image, "  ".to_string()).is_err());
        assert!(app.ledger().read_all().unwrap().is_empty());
    }

    #[test]
    fn test_confirm_without_retraining() {
        let (_dir, app, image) = setup();
        app.replace_settings(Settings {
            retrain_on_confirm: false,
            ..Settings::default()
        })
        .unwrap();
        generate_captions(&app, image.clone(), None).unwrap();

        let payload = confirm_caption(&app, image.clone(), " a dog running ".to_string()).unwrap();
        assert_eq!(payload.record.chosen_caption, "a dog running");
        assert!(matches!(payload.retraining, RetrainingOutcome::Skipped { .. }));

        // Confirming the same choice again is a second, valid record
        confirm_caption(&app, image, "a dog running".to_string()).unwrap();
        assert_eq!(app.ledger().read_all().unwrap().len(), 2);
        assert!(app.orchestrator().list_jobs().is_empty());
    }
}
