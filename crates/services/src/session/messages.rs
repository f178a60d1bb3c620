//! Fixed bot texts.

use tutor_core::ledger::QuizOutcome;
use tutor_core::model::{Language, StoryAction};

pub const AI_FALLBACK: &str = "I'm having trouble understanding right now. Could you please try again? 🤔 Don't worry, I'm here to help you learn!";

pub const SPEECH_UNAVAILABLE: &str =
    "Sorry, text-to-speech is currently unavailable. Please try again later.";

pub const FEEDBACK_FAILED: &str = "Sorry, we couldn't send your feedback right now. Please try again later.";

pub const CHALLENGE_ACCEPTED: &str = "🚀 Challenge accepted! You're so brave and determined! I believe in you - let's work together to complete this challenge and earn those points. Remember, every challenge makes you stronger and smarter!";

/// Greeting that opens every transcript, in the learner's language.
#[must_use]
pub fn welcome(language: Language) -> &'static str {
    match language {
        Language::En => "Hello! I'm your learning buddy! 🌟 Pick a subject or ask me anything you're curious about.",
        Language::Hi => "नमस्ते! मैं आपका सीखने का साथी हूँ! 🌟 कोई विषय चुनें या मुझसे कुछ भी पूछें।",
        Language::Te => "నమస్తే! నేను మీ నేర్చుకునే స్నేహితుడిని! 🌟 ఒక విషయాన్ని ఎంచుకోండి లేదా నన్ను ఏదైనా అడగండి.",
        Language::Ta => "வணக்கம்! நான் உங்கள் கற்றல் நண்பன்! 🌟 ஒரு பாடத்தைத் தேர்ந்தெடுக்கவும் அல்லது என்னிடம் எதையும் கேளுங்கள்.",
        Language::Kn => "ನಮಸ್ಕಾರ! ನಾನು ನಿಮ್ಮ ಕಲಿಕೆಯ ಗೆಳೆಯ! 🌟 ಒಂದು ವಿಷಯವನ್ನು ಆರಿಸಿ ಅಥವಾ ನನ್ನನ್ನು ಏನಾದರೂ ಕೇಳಿ.",
        Language::Ml => "നമസ്കാരം! ഞാൻ നിങ്ങളുടെ പഠന കൂട്ടുകാരനാണ്! 🌟 ഒരു വിഷയം തിരഞ്ഞെടുക്കുക അല്ലെങ്കിൽ എന്നോട് എന്തും ചോദിക്കൂ.",
        Language::Gu => "નમસ્તે! હું તમારો શીખવાનો સાથી છું! 🌟 કોઈ વિષય પસંદ કરો અથવા મને કંઈપણ પૂછો.",
        Language::Bn => "নমস্কার! আমি তোমার শেখার বন্ধু! 🌟 একটি বিষয় বেছে নাও বা আমাকে যা খুশি জিজ্ঞেস করো।",
    }
}

#[must_use]
pub fn quiz_completed(outcome: &QuizOutcome) -> String {
    let level_up = if outcome.leveled_up() {
        format!("🎊 Level up! You're now level {}!", outcome.new_level())
    } else {
        String::new()
    };
    format!(
        "🎉 Quiz completed! You scored {}/{} ({}%) and earned {} points! {level_up} Keep up the great work!",
        outcome.score,
        outcome.question_count,
        outcome.rounded_percentage(),
        outcome.points_earned,
    )
}

#[must_use]
pub fn story_action(action: StoryAction) -> &'static str {
    match action {
        StoryAction::StartReading => "📖 Wonderful! Let's begin this magical story journey together. Take your time reading each page, and don't hesitate to ask me questions about anything you don't understand!",
        StoryAction::NextPage => "📄 Great job reading! You're doing so well. Keep going - the story gets even more exciting!",
        StoryAction::StoryComplete => "🎉 Congratulations! You've completed the entire story! You're becoming such a great reader. What did you think of the story? Did you learn something new?",
    }
}

#[must_use]
pub fn feedback_thanks(positive: bool) -> String {
    let closing = if positive {
        "I'm thrilled you're enjoying our time together!"
    } else {
        "I'll work harder to make learning even more fun for you!"
    };
    format!(
        "Thank you so much for your feedback! 💝 Your thoughts help me become a better learning assistant. I'm so happy to be part of your learning journey! {closing}"
    )
}
