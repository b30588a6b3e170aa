//! Timed text reveal with rich-text awareness.
//!
//! `<b>` and `<i>` change reveal speed and blip cue set, other tags pass
//! through to the renderer untouched, and `<delay:N>` pauses the reveal for
//! N seconds without being rendered.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TextStyle {
    Normal,
    Bold,
    Italic,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum RevealStep {
    /// One character; `end` is the byte offset just past it in the rendered text.
    Glyph {
        end: usize,
        style: TextStyle,
        audible: bool,
    },
    Pause(f32),
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct RevealScript {
    pub rendered: String,
    pub steps: Vec<RevealStep>,
}

impl RevealScript {
    pub fn glyph_count(&self) -> usize {
        self.steps
            .iter()
            .filter(|step| matches!(step, RevealStep::Glyph { .. }))
            .count()
    }
}

pub fn parse_markup(text: &str) -> RevealScript {
    let mut script = RevealScript::default();
    let mut bold = 0u32;
    let mut italic = 0u32;
    let mut rest = text;

    while let Some(ch) = rest.chars().next() {
        if ch == '<' {
            if let Some(close) = rest.find('>').filter(|&close| is_tag(&rest[1..close])) {
                let tag = &rest[1..close];
                let raw = &rest[..=close];
                rest = &rest[close + 1..];

                if let Some(seconds) = tag.strip_prefix("delay:") {
                    match seconds.trim().parse::<f32>() {
                        Ok(seconds) if seconds > 0.0 => {
                            script.steps.push(RevealStep::Pause(seconds));
                        }
                        Ok(_) => {}
                        Err(_) => script.rendered.push_str(raw),
                    }
                    continue;
                }

                match tag.trim().to_ascii_lowercase().as_str() {
                    "b" => bold += 1,
                    "/b" => bold = bold.saturating_sub(1),
                    "i" => italic += 1,
                    "/i" => italic = italic.saturating_sub(1),
                    _ => {}
                }
                script.rendered.push_str(raw);
                continue;
            }
        }

        script.rendered.push(ch);
        rest = &rest[ch.len_utf8()..];
        let style = if bold > 0 {
            TextStyle::Bold
        } else if italic > 0 {
            TextStyle::Italic
        } else {
            TextStyle::Normal
        };
        script.steps.push(RevealStep::Glyph {
            end: script.rendered.len(),
            style,
            audible: !ch.is_whitespace(),
        });
    }

    script
}

/// `delay:N`, or a rich-text name with an optional `=value`, e.g. `b`, `/i`, `color=#f00`.
fn is_tag(tag: &str) -> bool {
    if tag.starts_with("delay:") {
        return true;
    }
    let body = tag.strip_prefix('/').unwrap_or(tag);
    let name_end = body
        .find(|c: char| !c.is_ascii_alphabetic())
        .unwrap_or(body.len());
    if name_end == 0 {
        return false;
    }
    match &body[name_end..] {
        "" => true,
        value => value.starts_with('=') && !value.contains('<'),
    }
}

/// Reveal pacing for one speaker.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RevealProfile {
    pub chars_per_second: f32,
    pub bold_multiplier: f32,
    pub italic_multiplier: f32,
    pub blip_interval: u32,
}

impl Default for RevealProfile {
    fn default() -> Self {
        Self {
            chars_per_second: 40.0,
            bold_multiplier: 0.6,
            italic_multiplier: 0.8,
            blip_interval: 2,
        }
    }
}

impl RevealProfile {
    fn seconds_per_glyph(&self, style: TextStyle) -> f32 {
        let multiplier = match style {
            TextStyle::Normal => 1.0,
            TextStyle::Bold => self.bold_multiplier,
            TextStyle::Italic => self.italic_multiplier,
        };
        let rate = self.chars_per_second * multiplier;
        if rate <= 0.0 {
            0.0
        } else {
            1.0 / rate
        }
    }
}

#[derive(Debug, Clone)]
pub struct Typewriter {
    script: RevealScript,
    profile: RevealProfile,
    cursor: usize,
    visible_end: usize,
    timer: f32,
    audible_since_blip: u32,
}

impl Typewriter {
    pub fn new(text: &str, profile: RevealProfile) -> Self {
        let mut typewriter = Self {
            script: parse_markup(text),
            profile,
            cursor: 0,
            visible_end: 0,
            timer: 0.0,
            audible_since_blip: 0,
        };
        if profile.chars_per_second <= 0.0 {
            typewriter.complete();
        }
        typewriter.settle();
        typewriter
    }

    /// Advance by `dt` seconds, pushing one style per blip that should sound.
    pub fn tick(&mut self, dt: f32, blips: &mut Vec<TextStyle>) -> bool {
        if self.is_finished() {
            return true;
        }
        self.timer += dt.max(0.0);
        while let Some(step) = self.script.steps.get(self.cursor).copied() {
            match step {
                RevealStep::Pause(seconds) => {
                    if self.timer < seconds {
                        break;
                    }
                    self.timer -= seconds;
                }
                RevealStep::Glyph { end, style, audible } => {
                    let cost = self.profile.seconds_per_glyph(style);
                    if self.timer < cost {
                        break;
                    }
                    self.timer -= cost;
                    self.visible_end = end;
                    if audible {
                        if self.audible_since_blip == 0 {
                            blips.push(style);
                        }
                        self.audible_since_blip =
                            (self.audible_since_blip + 1) % self.profile.blip_interval.max(1);
                    }
                }
            }
            self.cursor += 1;
        }
        self.settle();
        self.is_finished()
    }

    /// Show the whole line immediately.
    pub fn complete(&mut self) {
        self.cursor = self.script.steps.len();
        self.settle();
    }

    pub fn is_finished(&self) -> bool {
        self.cursor >= self.script.steps.len()
    }

    pub fn visible_text(&self) -> &str {
        &self.script.rendered[..self.visible_end]
    }

    pub fn full_text(&self) -> &str {
        &self.script.rendered
    }

    fn settle(&mut self) {
        if self.is_finished() {
            self.visible_end = self.script.rendered.len();
            self.timer = 0.0;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn profile(cps: f32) -> RevealProfile {
        RevealProfile {
            chars_per_second: cps,
            bold_multiplier: 0.5,
            italic_multiplier: 1.0,
            blip_interval: 1,
        }
    }

    #[test]
    fn delay_markup_is_not_rendered() {
        let script = parse_markup("Wait<delay:0.5>... what?");
        assert_eq!(script.rendered, "Wait... what?");
        assert!(script.steps.contains(&RevealStep::Pause(0.5)));
        assert_eq!(script.glyph_count(), "Wait... what?".chars().count());
    }

    #[test]
    fn style_tags_render_and_change_style() {
        let script = parse_markup("a<b>b</b><i>c</i>");
        assert_eq!(script.rendered, "a<b>b</b><i>c</i>");
        let styles: Vec<TextStyle> = script
            .steps
            .iter()
            .filter_map(|step| match step {
                RevealStep::Glyph { style, .. } => Some(*style),
                RevealStep::Pause(_) => None,
            })
            .collect();
        assert_eq!(styles, vec![TextStyle::Normal, TextStyle::Bold, TextStyle::Italic]);
    }

    #[test]
    fn unterminated_angle_bracket_is_literal() {
        let script = parse_markup("1 < 2");
        assert_eq!(script.rendered, "1 < 2");
        assert_eq!(script.glyph_count(), 5);
    }

    #[test]
    fn comparison_brackets_are_typed_out() {
        let script = parse_markup("a < b and c > d");
        assert_eq!(script.rendered, "a < b and c > d");
        assert_eq!(script.glyph_count(), "a < b and c > d".chars().count());

        let mixed = parse_markup("x <color=#f00>y</color> <3 >");
        assert_eq!(mixed.rendered, "x <color=#f00>y</color> <3 >");
        assert_eq!(mixed.glyph_count(), "x y <3 >".chars().count());
    }

    #[test]
    fn reveal_follows_rate_and_pauses() {
        let mut writer = Typewriter::new("ab<delay:1>c", profile(10.0));
        let mut blips = Vec::new();
        writer.tick(0.1, &mut blips);
        assert_eq!(writer.visible_text(), "a");
        writer.tick(0.1, &mut blips);
        assert_eq!(writer.visible_text(), "ab");
        writer.tick(0.5, &mut blips);
        assert_eq!(writer.visible_text(), "ab");
        assert!(!writer.tick(0.55, &mut blips));
        assert!(writer.tick(0.1, &mut blips));
        assert_eq!(writer.visible_text(), "abc");
        assert_eq!(blips.len(), 3);
    }

    #[test]
    fn bold_text_reveals_slower() {
        let mut writer = Typewriter::new("<b>xy</b>", profile(10.0));
        let mut blips = Vec::new();
        writer.tick(0.15, &mut blips);
        assert_eq!(writer.visible_text(), "");
        writer.tick(0.06, &mut blips);
        assert_eq!(writer.visible_text(), "<b>x");
        assert_eq!(blips, vec![TextStyle::Bold]);
    }

    #[test]
    fn complete_reveals_trailing_tags() {
        let mut writer = Typewriter::new("<i>hm</i>", profile(1.0));
        assert_eq!(writer.visible_text(), "");
        writer.complete();
        assert!(writer.is_finished());
        assert_eq!(writer.visible_text(), "<i>hm</i>");
    }

    #[test]
    fn blips_skip_whitespace_and_respect_interval() {
        let mut writer = Typewriter::new("ab cd", RevealProfile {
            blip_interval: 2,
            ..profile(100.0)
        });
        let mut blips = Vec::new();
        writer.tick(1.0, &mut blips);
        assert!(writer.is_finished());
        assert_eq!(blips.len(), 2);
    }

    #[test]
    fn zero_rate_or_empty_text_is_instant() {
        assert!(Typewriter::new("anything", profile(0.0)).is_finished());
        assert!(Typewriter::new("", profile(10.0)).is_finished());
    }
}
