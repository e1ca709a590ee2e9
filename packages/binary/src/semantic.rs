//! Value-range repair applied at [`ValidationLevel::Semantic`](crate::ValidationLevel).
//!
//! Every repair substitutes a documented default and records a
//! [`WarningCode::ValueOutOfRange`] warning for the component it touched.

use kir_model::{
    Color, Component, ComponentId, Dimension, DimensionKind, Layout, Style, ValidationWarning,
    WarningCode, DEFAULT_FONT_SIZE, DEFAULT_FONT_WEIGHT, INFINITE_ITERATIONS,
};

const MAX_FONT_WEIGHT: u16 = 1000;

pub(crate) fn repair_tree(root: &mut Component, warnings: &mut Vec<ValidationWarning>) {
    root.for_each_mut(|node| {
        let mut repairs = Repairs {
            component: node.id,
            warnings: &mut *warnings,
        };
        if let Some(style) = node.style.as_deref_mut() {
            repairs.style(style);
        }
        if let Some(layout) = node.layout.as_mut() {
            repairs.layout(layout);
        }
    });
}

struct Repairs<'w> {
    component: ComponentId,
    warnings: &'w mut Vec<ValidationWarning>,
}

impl Repairs<'_> {
    fn report(&mut self, field: &str, message: String) {
        self.warnings.push(
            ValidationWarning::warning(WarningCode::ValueOutOfRange, format!("{}: {}", field, message))
                .with_component(self.component),
        );
    }

    fn style(&mut self, style: &mut Style) {
        self.dimension("width", &mut style.width);
        self.dimension("height", &mut style.height);
        self.color("background", &mut style.background);
        self.color("border color", &mut style.border.color);
        self.color("text color", &mut style.font.color);
        self.opacity("opacity", &mut style.opacity);

        let font = &mut style.font;
        if font.size.is_nan() || font.size <= 0.0 {
            self.report("font size", format!("{} replaced by {}", font.size, DEFAULT_FONT_SIZE));
            font.size = DEFAULT_FONT_SIZE;
        }
        if font.weight == 0 || font.weight > MAX_FONT_WEIGHT {
            self.report("font weight", format!("{} replaced by {}", font.weight, DEFAULT_FONT_WEIGHT));
            font.weight = DEFAULT_FONT_WEIGHT;
        }

        for animation in &mut style.animations {
            self.non_negative("animation duration", &mut animation.duration_ms);
            self.non_negative("animation delay", &mut animation.delay_ms);
            if animation.iteration_count < INFINITE_ITERATIONS {
                self.report(
                    "animation iteration count",
                    format!("{} replaced by 1", animation.iteration_count),
                );
                animation.iteration_count = 1;
            }
        }
        for transition in &mut style.transitions {
            self.non_negative("transition duration", &mut transition.duration_ms);
            self.non_negative("transition delay", &mut transition.delay_ms);
        }
        for pseudo in &mut style.pseudo_styles {
            for color in [
                &mut pseudo.background,
                &mut pseudo.text_color,
                &mut pseudo.border_color,
            ]
            .into_iter()
            .flatten()
            {
                self.color("pseudo style color", color);
            }
            if let Some(opacity) = pseudo.opacity.as_mut() {
                self.opacity("pseudo style opacity", opacity);
            }
        }
        for breakpoint in &mut style.breakpoints {
            if let Some(width) = breakpoint.width.as_mut() {
                self.dimension("breakpoint width", width);
            }
            if let Some(height) = breakpoint.height.as_mut() {
                self.dimension("breakpoint height", height);
            }
        }
        for shadow in &mut style.shadows {
            self.color("shadow color", &mut shadow.color);
        }
    }

    fn layout(&mut self, layout: &mut Layout) {
        self.non_negative("gap", &mut layout.gap);
        self.non_negative("grow", &mut layout.grow);
        self.non_negative("shrink", &mut layout.shrink);
        self.non_negative("aspect ratio", &mut layout.aspect_ratio);
        self.dimension("min width", &mut layout.min_width);
        self.dimension("max width", &mut layout.max_width);
        self.dimension("min height", &mut layout.min_height);
        self.dimension("max height", &mut layout.max_height);
    }

    fn dimension(&mut self, field: &str, dimension: &mut Dimension) {
        let negative = matches!(dimension.kind, DimensionKind::Px | DimensionKind::Percent)
            && dimension.value < 0.0;
        if !dimension.value.is_finite() || negative {
            self.report(field, format!("{} replaced by 0", dimension.value));
            dimension.value = 0.0;
        }
    }

    fn color(&mut self, field: &str, color: &mut Color) {
        if matches!(color, Color::Gradient(0) | Color::Variable(0)) {
            self.report(field, "reference to id 0 replaced by transparent".to_string());
            *color = Color::Transparent;
        }
    }

    fn opacity(&mut self, field: &str, opacity: &mut f32) {
        if opacity.is_nan() {
            self.report(field, "NaN replaced by 1".to_string());
            *opacity = 1.0;
        } else if !(0.0..=1.0).contains(opacity) {
            let clamped = opacity.clamp(0.0, 1.0);
            self.report(field, format!("{} clamped to {}", opacity, clamped));
            *opacity = clamped;
        }
    }

    fn non_negative(&mut self, field: &str, value: &mut f32) {
        if value.is_nan() || *value < 0.0 {
            self.report(field, format!("{} replaced by 0", value));
            *value = 0.0;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use kir_model::{Animation, ComponentType};

    fn repaired(style: Style, layout: Layout) -> (Component, Vec<ValidationWarning>) {
        let mut root = Component::new(ComponentId(1), ComponentType::Container)
            .with_style(style)
            .with_layout(layout);
        let mut warnings = Vec::new();
        repair_tree(&mut root, &mut warnings);
        (root, warnings)
    }

    #[test]
    fn test_in_range_values_are_untouched() {
        let (root, warnings) = repaired(Style::default(), Layout::default());
        assert!(warnings.is_empty());
        assert_eq!(root.style.as_deref(), Some(&Style::default()));
    }

    #[test]
    fn test_documented_defaults() {
        let mut style = Style {
            width: Dimension::px(-5.0),
            height: Dimension::percent(f32::NAN),
            background: Color::Variable(0),
            opacity: 3.0,
            ..Style::default()
        };
        style.font.size = 0.0;
        style.font.weight = 1200;
        let mut animation = Animation::new("spin", -10.0);
        animation.iteration_count = -4;
        style.animations.push(animation);

        let layout = Layout {
            gap: -1.0,
            grow: f32::NAN,
            aspect_ratio: -2.0,
            ..Layout::default()
        };

        let (root, warnings) = repaired(style, layout);
        let style = root.style.as_deref().expect("style");
        assert_eq!(style.width, Dimension::px(0.0));
        assert_eq!(style.height.value, 0.0);
        assert_eq!(style.background, Color::Transparent);
        assert_eq!(style.opacity, 1.0);
        assert_eq!(style.font.size, DEFAULT_FONT_SIZE);
        assert_eq!(style.font.weight, DEFAULT_FONT_WEIGHT);
        assert_eq!(style.animations[0].duration_ms, 0.0);
        assert_eq!(style.animations[0].iteration_count, 1);

        let layout = root.layout.expect("layout");
        assert_eq!(layout.gap, 0.0);
        assert_eq!(layout.grow, 0.0);
        assert_eq!(layout.aspect_ratio, 0.0);

        assert_eq!(warnings.len(), 11);
        assert!(warnings
            .iter()
            .all(|w| w.code == WarningCode::ValueOutOfRange && w.component_id == Some(ComponentId(1))));
    }

    #[test]
    fn test_opacity_nan_and_infinite_iterations() {
        let mut style = Style {
            opacity: f32::NAN,
            ..Style::default()
        };
        let mut forever = Animation::new("pulse", 100.0);
        forever.iteration_count = INFINITE_ITERATIONS;
        style.animations.push(forever);

        let (root, warnings) = repaired(style, Layout::default());
        let style = root.style.as_deref().expect("style");
        assert_eq!(style.opacity, 1.0);
        assert_eq!(style.animations[0].iteration_count, INFINITE_ITERATIONS);
        assert_eq!(warnings.len(), 1);
    }
}
