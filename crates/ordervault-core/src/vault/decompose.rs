//! Order event → Data Vault entity set.
//!
//! [`decompose`] is pure: no I/O, no clock. Hubs are derived first; their
//! surrogate ids are then passed explicitly into the link and satellite
//! builders, so every link and satellite references only hubs derived from
//! the same event.
//!
//! The product–category links are the full cartesian product of the event's
//! products and categories. The event carries no per-product categorization,
//! so every product is linked to every category present.

use crate::event::{DecomposeError, OrderEvent};
use crate::key::SurrogateId;

use super::{
    CategoryHub, EntitySet, Hubs, Links, LoadContext, OrderCost, OrderHub, OrderProductLink,
    OrderStatus, OrderUserLink, ProductCategoryLink, ProductHub, ProductNames,
    ProductRestaurantLink, RestaurantHub, RestaurantNames, Satellites, UserHub, UserNames,
};

/// Decompose one order event into its hubs, links and satellites.
///
/// # Errors
///
/// Returns [`DecomposeError::EmptyKey`] if a natural key of the event is
/// empty. Nothing is derived for a rejected event.
pub fn decompose(event: &OrderEvent, ctx: &LoadContext) -> Result<EntitySet, DecomposeError> {
    event.validate()?;

    let hubs = build_hubs(event, ctx);
    let links = build_links(&hubs, ctx);
    let satellites = build_satellites(event, &hubs, ctx);

    Ok(EntitySet {
        hubs,
        links,
        satellites,
    })
}

// ---------------------------------------------------------------------------
// Hubs
// ---------------------------------------------------------------------------

fn build_hubs(event: &OrderEvent, ctx: &LoadContext) -> Hubs {
    let user = UserHub {
        h_user_pk: SurrogateId::derive(&event.user.id),
        user_id: event.user.id.clone(),
        load_dt: ctx.load_dt,
        load_src: ctx.load_src.clone(),
    };

    let order = OrderHub {
        h_order_pk: SurrogateId::derive(&event.order.id),
        order_id: event.order.id.clone(),
        order_dt: event.order.date.clone(),
        load_dt: ctx.load_dt,
        load_src: ctx.load_src.clone(),
    };

    let restaurant = RestaurantHub {
        h_restaurant_pk: SurrogateId::derive(&event.restaurant.id),
        restaurant_id: event.restaurant.id.clone(),
        load_dt: ctx.load_dt,
        load_src: ctx.load_src.clone(),
    };

    let products = event
        .products
        .iter()
        .map(|product| ProductHub {
            h_product_pk: SurrogateId::derive(&product.id),
            product_id: product.id.clone(),
            load_dt: ctx.load_dt,
            load_src: ctx.load_src.clone(),
        })
        .collect();

    let categories = event
        .categories
        .iter()
        .map(|category| CategoryHub {
            h_category_pk: SurrogateId::derive(&category.name),
            category_name: category.name.clone(),
            load_dt: ctx.load_dt,
            load_src: ctx.load_src.clone(),
        })
        .collect();

    Hubs {
        user,
        order,
        restaurant,
        products,
        categories,
    }
}

// ---------------------------------------------------------------------------
// Links
// ---------------------------------------------------------------------------

fn build_links(hubs: &Hubs, ctx: &LoadContext) -> Links {
    let h_order_pk = hubs.order.h_order_pk;
    let h_restaurant_pk = hubs.restaurant.h_restaurant_pk;

    Links {
        order_products: order_product_links(h_order_pk, &hubs.products, ctx),
        product_restaurants: product_restaurant_links(&hubs.products, h_restaurant_pk, ctx),
        product_categories: product_category_links(&hubs.products, &hubs.categories, ctx),
        order_user: order_user_link(h_order_pk, hubs.user.h_user_pk, ctx),
    }
}

fn order_product_links(
    h_order_pk: SurrogateId,
    products: &[ProductHub],
    ctx: &LoadContext,
) -> Vec<OrderProductLink> {
    products
        .iter()
        .map(|product| OrderProductLink {
            hk_order_product_pk: SurrogateId::link(h_order_pk, product.h_product_pk),
            h_order_pk,
            h_product_pk: product.h_product_pk,
            load_dt: ctx.load_dt,
            load_src: ctx.load_src.clone(),
        })
        .collect()
}

fn product_restaurant_links(
    products: &[ProductHub],
    h_restaurant_pk: SurrogateId,
    ctx: &LoadContext,
) -> Vec<ProductRestaurantLink> {
    products
        .iter()
        .map(|product| ProductRestaurantLink {
            hk_product_restaurant_pk: SurrogateId::link(product.h_product_pk, h_restaurant_pk),
            h_product_pk: product.h_product_pk,
            h_restaurant_pk,
            load_dt: ctx.load_dt,
            load_src: ctx.load_src.clone(),
        })
        .collect()
}

fn product_category_links(
    products: &[ProductHub],
    categories: &[CategoryHub],
    ctx: &LoadContext,
) -> Vec<ProductCategoryLink> {
    let mut links = Vec::with_capacity(products.len() * categories.len());
    for product in products {
        for category in categories {
            links.push(ProductCategoryLink {
                hk_product_category_pk: SurrogateId::link(
                    product.h_product_pk,
                    category.h_category_pk,
                ),
                h_product_pk: product.h_product_pk,
                h_category_pk: category.h_category_pk,
                load_dt: ctx.load_dt,
                load_src: ctx.load_src.clone(),
            });
        }
    }
    links
}

fn order_user_link(
    h_order_pk: SurrogateId,
    h_user_pk: SurrogateId,
    ctx: &LoadContext,
) -> OrderUserLink {
    OrderUserLink {
        hk_order_user_pk: SurrogateId::link(h_order_pk, h_user_pk),
        h_order_pk,
        h_user_pk,
        load_dt: ctx.load_dt,
        load_src: ctx.load_src.clone(),
    }
}

// ---------------------------------------------------------------------------
// Satellites
// ---------------------------------------------------------------------------

fn build_satellites(event: &OrderEvent, hubs: &Hubs, ctx: &LoadContext) -> Satellites {
    let h_user_pk = hubs.user.h_user_pk;
    let h_order_pk = hubs.order.h_order_pk;
    let h_restaurant_pk = hubs.restaurant.h_restaurant_pk;

    let user_names = UserNames {
        h_user_pk,
        username: event.user.name.clone(),
        userlogin: event.user.login.clone(),
        load_dt: ctx.load_dt,
        load_src: ctx.load_src.clone(),
        hk_user_names_hashdiff: SurrogateId::hashdiff(
            h_user_pk,
            &[&event.user.name, &event.user.login],
        ),
    };

    // Product hubs and event products are index-aligned.
    let product_names = hubs
        .products
        .iter()
        .zip(&event.products)
        .map(|(hub, product)| {
            let name = product.display_name();
            ProductNames {
                h_product_pk: hub.h_product_pk,
                name: name.to_string(),
                load_dt: ctx.load_dt,
                load_src: ctx.load_src.clone(),
                hk_product_names_hashdiff: SurrogateId::hashdiff(hub.h_product_pk, &[name]),
            }
        })
        .collect();

    let restaurant_names = RestaurantNames {
        h_restaurant_pk,
        name: event.restaurant.name.clone(),
        load_dt: ctx.load_dt,
        load_src: ctx.load_src.clone(),
        hk_restaurant_names_hashdiff: SurrogateId::hashdiff(
            h_restaurant_pk,
            &[&event.restaurant.name],
        ),
    };

    let cost_text = event.order.cost.to_string();
    let order_cost = OrderCost {
        h_order_pk,
        cost: event.order.cost,
        payment: event.order.payment.clone(),
        load_dt: ctx.load_dt,
        load_src: ctx.load_src.clone(),
        hk_order_cost_hashdiff: SurrogateId::hashdiff(
            h_order_pk,
            &[&cost_text, &event.order.payment],
        ),
    };

    let order_status = OrderStatus {
        h_order_pk,
        status: event.status.clone(),
        load_dt: ctx.load_dt,
        load_src: ctx.load_src.clone(),
        hk_order_status_hashdiff: SurrogateId::hashdiff(h_order_pk, &[&event.status]),
    };

    Satellites {
        user_names,
        product_names,
        restaurant_names,
        order_cost,
        order_status,
    }
}
