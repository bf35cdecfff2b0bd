//! Prompt construction for the advisory oracle.
//!
//! The robot describes its situation in plain text — bucketed distance, seen
//! color, time of day, a few recent actions — and asks for either one JSON
//! decision object or an array of them. The autonomous path varies its
//! framing with a random mood so the oracle does not settle into a rut.

use rand::seq::IndexedRandom;

use stormbot_types::{Color, DecisionContext, Limits, SensorSnapshot};

const MOODS: &[&str] = &[
    "cheerful",
    "pensive",
    "curious",
    "energetic",
    "calm",
    "playful",
    "sarcastic",
    "friendly",
];

const MOOD_TEMPLATES: &[&str] = &[
    "Be {mood} and {action}",
    "Show your {mood} side and {action}",
    "Today you are {mood}, so {action}",
    "As a {mood} robot you should {action}",
];

const ACTION_PHRASES: &[&str] = &[
    "do something interesting",
    "take the initiative",
    "show what you can do",
    "say something and back it up with a move",
    "react to your surroundings",
    "make an expressive move",
    "share a thought and act on it",
    "get creative with your actions",
];

const AUTONOMOUS_PROMPTS: &[&str] = &[
    "What interesting thing should I do right now?",
    "Look around and come up with something",
    "Show some personality",
    "Show what you are capable of",
    "Do something unexpected",
    "How are you feeling?",
    "What is new around here?",
    "Tell a story and act it out",
];

/// Random mood framing for an autonomous cycle.
pub fn random_context_line() -> String {
    let mut rng = rand::rng();
    let mood = MOODS.choose(&mut rng).copied().unwrap_or("curious");
    let template = MOOD_TEMPLATES.choose(&mut rng).copied().unwrap_or("Be {mood} and {action}");
    let action = ACTION_PHRASES.choose(&mut rng).copied().unwrap_or("do something interesting");
    template.replace("{mood}", mood).replace("{action}", action)
}

/// Random request text for an autonomous cycle.
pub fn random_autonomous_prompt() -> &'static str {
    let mut rng = rand::rng();
    AUTONOMOUS_PROMPTS
        .choose(&mut rng)
        .copied()
        .unwrap_or(AUTONOMOUS_PROMPTS[0])
}

/// Bucketed plain-text description of what the sensors see.
pub fn situation_description(snapshot: &SensorSnapshot) -> String {
    let distance = snapshot.ir_distance;
    let color_desc = snapshot.color.description();

    let color_text = match snapshot.color {
        Color::Black | Color::NoColor => "no recognizable color".to_string(),
        _ => format!("I can see {color_desc}"),
    };

    if distance > 99 {
        return format!("Nothing ahead, {color_desc}.");
    }

    let distance_desc = if distance < 33 {
        "very close"
    } else if distance < 66 {
        "at medium range"
    } else {
        "far away"
    };

    format!("An object {distance_desc} ({distance} units), {color_text}.")
}

/// Full instruction text for a general-path decision request.
pub fn build_decision_prompt(
    context: DecisionContext,
    user_prompt: &str,
    snapshot: &SensorSnapshot,
    recent_actions: &[String],
    limits: &Limits,
) -> String {
    let (context_line, request) = match context {
        DecisionContext::Autonomous => (random_context_line(), user_prompt.to_string()),
        DecisionContext::Button => (
            "The user pressed the button. React quickly and expressively!".to_string(),
            user_prompt.to_string(),
        ),
        DecisionContext::Terminal => (
            format!("The user issued a command: {user_prompt}"),
            "Carry out the user's command".to_string(),
        ),
        DecisionContext::Obstacle => ("What should I do?".to_string(), user_prompt.to_string()),
    };

    let history_context = if recent_actions.is_empty() {
        String::new()
    } else {
        format!("\n\nRecent actions: {}", recent_actions.join(", "))
    };

    format!(
        "You are the robot STORMBOT. You may reply with ONE JSON object or an ARRAY of \
         JSON objects forming an action sequence.\n\
         \n\
         Format of a single action:\n\
         {{\n\
             \"action\": \"move_forward|move_backward|turn_left|turn_right|attack|speak|stop\",\n\
             \"speed\": number from 0 to 100,\n\
             \"duration\": number in seconds,\n\
             \"angle\": number in degrees,\n\
             \"speech\": \"text to speak aloud\"\n\
         }}\n\
         \n\
         Situation: {situation}\n\
         Time: {time}{history_context}\n\
         Context ({tag}): {context_line}\n\
         Request: {request}\n\
         \n\
         Constraints:\n\
         - Motion duration at most {max_move} seconds\n\
         - Turn angle at most {max_angle} degrees\n\
         - Motor speed between 0 and 100\n\
         - At most {max_actions} actions in a sequence\n\
         \n\
         Reply with the JSON (object or array) and nothing else.",
        situation = situation_description(snapshot),
        time = snapshot.time_of_day(),
        tag = context.as_tag(),
        max_move = limits.max_move_duration,
        max_angle = limits.max_turn_angle,
        max_actions = limits.max_sequence_actions,
    )
}

/// Instruction text for the obstacle-reaction request.
pub fn build_obstacle_prompt(distance: u8) -> String {
    format!(
        "You are the robot STORMBOT. There is an obstacle {distance} units in front of you.\n\
         \n\
         You must react to the obstacle. Reply with ONE JSON object or an ARRAY of JSON \
         objects, each of the form:\n\
         {{\n\
             \"action\": \"move_forward|move_backward|turn_left|turn_right|attack|speak|stop\",\n\
             \"speed\": number from 0 to 100,\n\
             \"duration\": number in seconds,\n\
             \"angle\": number in degrees,\n\
             \"speech\": \"text to speak aloud\"\n\
         }}\n\
         \n\
         Send your reaction to the obstacle. Reply with the JSON and nothing else."
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Local;

    fn snapshot(distance: u8, color: Color) -> SensorSnapshot {
        SensorSnapshot {
            ir_distance: distance,
            color,
            buttons_pressed: false,
            gyro_angle: None,
            gyro_rate: None,
            captured_at: Local::now(),
            obstacle_detected: distance < 20,
        }
    }

    #[test]
    fn situation_buckets_by_distance() {
        assert!(situation_description(&snapshot(10, Color::Red)).contains("very close"));
        assert!(situation_description(&snapshot(50, Color::Red)).contains("at medium range"));
        assert!(situation_description(&snapshot(90, Color::Red)).contains("far away"));
        assert!(situation_description(&snapshot(100, Color::Red)).starts_with("Nothing ahead"));
    }

    #[test]
    fn situation_names_the_seen_color() {
        let text = situation_description(&snapshot(50, Color::Blue));
        assert!(text.contains("I can see blue"));
        let none = situation_description(&snapshot(50, Color::Black));
        assert!(none.contains("no recognizable color"));
    }

    #[test]
    fn decision_prompt_embeds_situation_and_constraints() {
        let text = build_decision_prompt(
            DecisionContext::Terminal,
            "drive in a square",
            &snapshot(80, Color::Green),
            &["hello".to_string()],
            &Limits::default(),
        );
        assert!(text.contains("The user issued a command: drive in a square"));
        assert!(text.contains("Carry out the user's command"));
        assert!(text.contains("Context (terminal)"));
        assert!(text.contains("far away"));
        assert!(text.contains("at most 3 seconds"));
        assert!(text.contains("at most 180 degrees"));
        assert!(text.contains("At most 5 actions"));
        assert!(text.contains("Recent actions: hello"));
    }

    #[test]
    fn decision_prompt_omits_empty_history() {
        let text = build_decision_prompt(
            DecisionContext::Button,
            "React to the button press",
            &snapshot(80, Color::NoColor),
            &[],
            &Limits::default(),
        );
        assert!(!text.contains("Recent actions"));
        assert!(text.contains("pressed the button"));
    }

    #[test]
    fn obstacle_prompt_names_the_distance() {
        let text = build_obstacle_prompt(15);
        assert!(text.contains("15 units"));
        assert!(text.contains("react to the obstacle"));
    }

    #[test]
    fn random_helpers_draw_from_fixed_pools() {
        let prompt = random_autonomous_prompt();
        assert!(AUTONOMOUS_PROMPTS.contains(&prompt));
        let line = random_context_line();
        assert!(!line.contains("{mood}"));
        assert!(!line.contains("{action}"));
    }
}
