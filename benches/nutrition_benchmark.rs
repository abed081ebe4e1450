use criterion::{criterion_group, criterion_main, Criterion};
use pregnancy_support::models::NutritionPlan;
use serde_json::json;
use std::hint::black_box;

const GENERATED_PLAN: &str = "Here is a nutrition plan tailored for a medium-risk pregnancy.\n\n\
Breakfast: Whole-grain oatmeal with chia seeds, sliced banana and a glass of fortified milk. \
Add a boiled egg for extra protein and choline.\n\n\
Lunch: Spinach and lentil salad with quinoa, cherry tomatoes, cucumber and olive oil dressing. \
Serve with a small whole-wheat pita.\n\n\
Dinner: Baked salmon with roasted sweet potato and steamed broccoli. \
Limit added salt and prefer herbs for flavour.\n\n\
Snacks: Greek yogurt with walnuts, carrot sticks with hummus, an apple.\n\n\
Recommendations: Take a prenatal vitamin with 400 mcg folic acid. Aim for 27 mg iron daily, \
pairing iron-rich foods with vitamin C. Drink 8-10 glasses of water. Avoid raw fish, \
unpasteurized cheese and limit caffeine to 200 mg per day.";

fn benchmark_parse_plan(c: &mut Criterion) {
    let mut group = c.benchmark_group("nutrition_plan_parse");

    group.bench_function("free_text", |b| {
        b.iter(|| NutritionPlan::parse_text(black_box(GENERATED_PLAN)))
    });

    // Plan with no headings: every section search misses
    let unstructured = GENERATED_PLAN.replace(':', " -");
    group.bench_function("no_headings", |b| {
        b.iter(|| NutritionPlan::parse_text(black_box(&unstructured)))
    });

    let structured = json!({
        "breakfast": "Oatmeal",
        "lunch": "Lentil salad",
        "dinner": "Salmon",
        "snacks": "Yogurt",
        "recommendations": "Folic acid"
    });
    group.bench_function("structured_object", |b| {
        b.iter(|| NutritionPlan::parse(black_box(&structured)))
    });

    group.finish();
}

criterion_group!(benches, benchmark_parse_plan);
criterion_main!(benches);
