/// Aggregate stats for one scheduler run.
#[derive(Debug, Default)]
pub struct RunStats {
    pub cycles_completed: u32,
    pub posts_published: u32,
    pub publish_errors: u32,
    pub replies_sent: u32,
    pub reply_errors: u32,
    pub candidates_seen: u32,
    pub candidates_skipped: u32,
    pub batches_dispatched: u32,
}

impl std::fmt::Display for RunStats {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "\n=== Engagement Run Complete ===")?;
        writeln!(f, "Cycles completed:   {}", self.cycles_completed)?;
        writeln!(f, "Posts published:    {}", self.posts_published)?;
        writeln!(f, "Publish errors:     {}", self.publish_errors)?;
        writeln!(f, "Replies sent:       {}", self.replies_sent)?;
        writeln!(f, "Reply errors:       {}", self.reply_errors)?;
        writeln!(f, "Candidates seen:    {}", self.candidates_seen)?;
        writeln!(f, "Candidates skipped: {}", self.candidates_skipped)?;
        writeln!(f, "Batches dispatched: {}", self.batches_dispatched)?;
        Ok(())
    }
}
