use std::path::Path;

use anyhow::{Context, Result};

use nutriclean::data::export::save_table;
use nutriclean::{Cell, Column, Table};

/// Minimal deterministic PRNG (xoshiro256**)
struct SimpleRng {
    state: [u64; 4],
}

impl SimpleRng {
    fn new(seed: u64) -> Self {
        let mut s = [0u64; 4];
        let mut x = seed;
        for slot in &mut s {
            x = x.wrapping_mul(6364136223846793005).wrapping_add(1);
            *slot = x;
        }
        SimpleRng { state: s }
    }

    fn next_u64(&mut self) -> u64 {
        let result = (self.state[1].wrapping_mul(5))
            .rotate_left(7)
            .wrapping_mul(9);
        let t = self.state[1] << 17;
        self.state[2] ^= self.state[0];
        self.state[3] ^= self.state[1];
        self.state[1] ^= self.state[2];
        self.state[0] ^= self.state[3];
        self.state[2] ^= t;
        self.state[3] = self.state[3].rotate_left(45);
        result
    }

    fn next_f64(&mut self) -> f64 {
        (self.next_u64() >> 11) as f64 / (1u64 << 53) as f64
    }

    fn range(&mut self, lo: f64, hi: f64) -> f64 {
        lo + (hi - lo) * self.next_f64()
    }

    fn pick<'a, T>(&mut self, items: &'a [T]) -> &'a T {
        &items[(self.next_u64() % items.len() as u64) as usize]
    }

    /// `true` with probability `p`.
    fn chance(&mut self, p: f64) -> bool {
        self.next_f64() < p
    }
}

/// (title stem, aisle, serving choices, base ingredients)
const PRODUCTS: &[(&str, &str, &[&str], &str)] = &[
    ("Cola", "Beverages", &["12 fl oz", "1 can", "355 ml"], "carbonated water, sugar, caramel color"),
    ("Diet Lemon Soda", "Beverages", &["12 fl oz", "1 can"], "carbonated water, citric acid, sucralose"),
    ("Green Tea", "Tea", &["8 fl oz", "1 tea bag", "1 bottle"], "water, green tea"),
    ("Orange Juice", "Beverages", &["8 fl oz", "1 cup", "240 ml"], "orange juice"),
    ("Potato Chips", "Snacks", &["28 g", "1 oz", "1 container"], "potatoes, vegetable oil, salt"),
    ("Frosted Cereal", "Breakfast", &["1 cup (39 g)", "39 g"], "corn, sugar, salt, msg"),
    ("Instant Noodles", "Pantry", &["1 packet", "85 g"], "wheat flour, palm oil, salt, msg"),
    ("Peanut Butter", "Pantry", &["2 tbsp", "32 g"], "peanuts, sugar, salt"),
];

const PACKAGING: &[&str] = &["", ", 12 Pack", " 6 Count", ", Pack of 24", " 16 oz Bottle", " 2 Liters"];

fn main() -> Result<()> {
    env_logger::init();
    let mut rng = SimpleRng::new(42);
    let rows = 60;

    let mut product_name = Vec::with_capacity(rows);
    let mut aisle = Vec::with_capacity(rows);
    let mut servingsize = Vec::with_capacity(rows);
    let mut sodium = Vec::with_capacity(rows);
    let mut sugar = Vec::with_capacity(rows);
    let mut saturatedfat = Vec::with_capacity(rows);
    let mut energykcal = Vec::with_capacity(rows);
    let mut ingredients = Vec::with_capacity(rows);
    let mut price = Vec::with_capacity(rows);
    let mut servingspercontainer = Vec::with_capacity(rows);

    for _ in 0..rows {
        let &(stem, section, servings, base) = rng.pick(PRODUCTS);
        let packaging = rng.pick(PACKAGING);
        let beverage = matches!(section, "Beverages" | "Tea");

        product_name.push(Cell::Text(format!("{stem}{packaging}")));
        aisle.push(Cell::from(section));
        // Some servings are left blank for fill_serving_size to recover.
        servingsize.push(if rng.chance(0.1) {
            Cell::Missing
        } else {
            Cell::from(*rng.pick(servings))
        });
        sodium.push(if rng.chance(0.05) {
            Cell::from("not found")
        } else {
            Cell::number(round2(rng.range(0.0, if beverage { 0.08 } else { 0.9 })))
        });
        sugar.push(Cell::number(round2(rng.range(0.0, if beverage { 40.0 } else { 25.0 }))));
        saturatedfat.push(if rng.chance(0.1) {
            Cell::Missing
        } else {
            Cell::number(round2(rng.range(0.0, if beverage { 1.0 } else { 8.0 })))
        });
        energykcal.push(Cell::number(rng.range(0.0, 400.0).round()));
        ingredients.push(Cell::from(base));
        price.push(Cell::number(round2(rng.range(0.99, 12.99))));
        servingspercontainer.push(Cell::from(format!("about {}", 1 + rng.next_u64() % 12)));
    }

    let table = Table::new(vec![
        Column::new("product_name", product_name),
        Column::new("aisle", aisle),
        Column::new("servingsize", servingsize),
        Column::new("sodium", sodium),
        Column::new("sugar", sugar),
        Column::new("saturatedfat", saturatedfat),
        Column::new("energykcal", energykcal),
        Column::new("ingredients", ingredients),
        Column::new("price", price),
        Column::new("servingspercontainer", servingspercontainer),
    ])?;

    let output_path = Path::new("sample_products.xlsx");
    save_table(&table, output_path)
        .with_context(|| format!("Failed to write {}", output_path.display()))?;

    println!(
        "Wrote {} products ({} columns) to {}",
        table.num_rows(),
        table.num_columns(),
        output_path.display()
    );
    Ok(())
}

fn round2(v: f64) -> f64 {
    (v * 100.0).round() / 100.0
}
