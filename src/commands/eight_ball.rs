use poise::serenity_prelude::{CreateEmbed, CreateEmbedFooter, Timestamp};
use rand::seq::SliceRandom;

use crate::{
    commands::reply_ephemeral, constants::embeds::EIGHT_BALL_COLOUR, validation::sanitize_input,
    Context, Error,
};

const RESPONSES: [&str; 20] = [
    "It is certain.",
    "It is decidedly so.",
    "Without a doubt.",
    "Yes definitely.",
    "You may rely on it.",
    "As I see it, yes.",
    "Most likely.",
    "Outlook good.",
    "Yes.",
    "Signs point to yes.",
    "Reply hazy, try again.",
    "Ask again later.",
    "Better not tell you now.",
    "Cannot predict now.",
    "Concentrate and ask again.",
    "Don't count on it.",
    "My reply is no.",
    "My sources say no.",
    "Outlook not so good.",
    "Very doubtful.",
];

fn random_response() -> &'static str {
    RESPONSES
        .choose(&mut rand::thread_rng())
        .copied()
        .unwrap_or(RESPONSES[0])
}

/// ask the magic 8-ball a question.
#[poise::command(slash_command, rename = "8ball", user_cooldown = 3)]
#[tracing::instrument(skip(ctx), fields(user_id = %ctx.author().id))]
pub async fn eight_ball(
    ctx: Context<'_>,
    #[description = "your yes/no question for the magic 8-ball"]
    #[max_length = 200]
    question: String,
) -> Result<(), Error> {
    let question = sanitize_input(&question);

    if question.trim().is_empty() {
        return reply_ephemeral(ctx, "❌ Please ask the magic 8-ball an actual question.").await;
    }

    let response = random_response();

    tracing::info!(user_tag = %ctx.author().tag(), question = %question, "8ball used");

    ctx.send(
        poise::CreateReply::default().embed(
            CreateEmbed::new()
                .colour(EIGHT_BALL_COLOUR)
                .title("🎱 The Magic 8-Ball says...")
                .field("Question", question, false)
                .field("Answer", format!("**{response}**"), false)
                .footer(CreateEmbedFooter::new("The magic 8-ball has spoken!"))
                .timestamp(Timestamp::now()),
        ),
    )
    .await
    .inspect_err(|e| tracing::error!(err = ?e, "an error occurred when sending reply"))?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use std::collections::HashSet;

    use super::*;

    #[test]
    fn test_random_response_is_a_known_answer() {
        for _ in 0..100 {
            assert!(RESPONSES.contains(&random_response()));
        }
    }

    #[test]
    fn test_responses_are_distinct() {
        assert_eq!(RESPONSES.iter().collect::<HashSet<_>>().len(), 20);
    }
}
